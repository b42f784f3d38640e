//! The pipeline engine (§4.E/§4.F): input-side redaction and policy steps run before a request
//! reaches an upstream provider, output-side steps run on the streamed response before it reaches
//! the client.

pub mod context;
pub mod input;
pub mod output;
pub mod steps;
