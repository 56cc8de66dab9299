//! Plain-data classification.
//!
//! [`PlainData`] is the single notion of "plain data" in this crate: any
//! [`bytemuck::Pod`] type qualifies. Byte views, recasts and the raw
//! copy helpers in [`util`](crate::util) are all bounded on it, so a type
//! that is not plain data is rejected when the program is compiled rather
//! than when the view is requested.
//!
//! `Pod` is stricter than "has no drop glue": `bool`, `char`, references
//! and structs with padding are excluded, because some byte patterns are
//! not valid values of them or some of their bytes are uninitialized.

/// Types whose every bit pattern is valid and that contain no references
/// or owned resources. Blanket-implemented for [`bytemuck::Pod`].
pub trait PlainData: bytemuck::Pod {}

impl<T: bytemuck::Pod> PlainData for T {}
