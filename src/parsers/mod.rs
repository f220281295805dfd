pub mod gtx;
pub mod sections;
pub mod sse;
