pub mod frame;
pub mod luma;
pub mod source;
pub mod synthetic;

pub use frame::{Frame, FrameMetadata, FrameProjection, Orientation, PixelFormat};
pub use luma::{to_luminance, LumaPlane};
pub use source::FrameSource;
pub use synthetic::SyntheticCamera;
