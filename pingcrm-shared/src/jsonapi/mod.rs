/// JSON:API shaping
///
/// - `document`: top-level envelopes, resource objects, request and error documents
/// - `serializer`: per-type descriptors and record serialization

pub mod document;
pub mod serializer;

pub use document::{Document, ErrorDocument, ErrorObject, ErrorSource, ResourceObject, MEDIA_TYPE};
pub use serializer::{serialize, serialize_many, ResourceDescriptor, SerializeError};
