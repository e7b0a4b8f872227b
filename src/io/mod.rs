mod byte_source;
mod http_transport;
mod local;
mod remote;

pub use byte_source::{read_full, ByteHandle, ByteSource, FileStat};
pub use http_transport::ReqwestTransport;
pub use local::LocalSource;
pub use remote::{range_ignored, HeadInfo, HttpTransport, RangeReply, RemoteSource};
