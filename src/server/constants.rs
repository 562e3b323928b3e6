/// Slack on top of the file size cap for multipart framing and the title field.
pub const MULTIPART_OVERHEAD_BYTES: u64 = 64 * 1024;
/// Multipart field carrying the uploaded file.
pub const UPLOAD_FILE_FIELD: &str = "uploadedFile";
