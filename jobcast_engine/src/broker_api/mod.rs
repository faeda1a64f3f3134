pub mod request_flow_api;

pub use request_flow_api::RequestFlowApi;
