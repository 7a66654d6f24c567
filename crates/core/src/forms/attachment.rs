//! Uploaded files.

use core::fmt;

/// A file uploaded with a submission.
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Form field the file arrived under.
    pub field: String,
    /// File name supplied by the client.
    pub file_name: String,
    /// Content type supplied by the client, if any.
    pub content_type: Option<String>,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl Attachment {
    /// Create an attachment.
    pub fn new(
        field: impl Into<String>,
        file_name: impl Into<String>,
        content_type: Option<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            field: field.into(),
            file_name: file_name.into(),
            content_type,
            bytes,
        }
    }

    /// Size of the file in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Lowercased file extension, without the dot.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        let (stem, ext) = self.file_name.rsplit_once('.')?;
        (!stem.is_empty() && !ext.is_empty()).then(|| ext.to_ascii_lowercase())
    }
}

// Contents are omitted so uploads never end up in logs.
impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("field", &self.field)
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("size", &self.size())
            .finish()
    }
}

/// Limits applied to uploaded files.
#[derive(Debug, Clone, Copy)]
pub struct AttachmentRules {
    /// Largest accepted file.
    pub max_bytes: usize,
    /// Most files accepted in one submission.
    pub max_files: usize,
    /// Accepted extensions, lowercase.
    pub extensions: &'static [&'static str],
}

impl AttachmentRules {
    /// Rules for CVs and supporting documents.
    #[must_use]
    pub const fn documents() -> Self {
        Self {
            max_bytes: 5 * 1024 * 1024,
            max_files: 5,
            extensions: &["pdf", "doc", "docx"],
        }
    }

    /// Check one file against the rules.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first rule the file breaks.
    pub fn check(&self, attachment: &Attachment) -> Result<(), String> {
        if attachment.bytes.is_empty() {
            return Err(format!("{} is empty", attachment.file_name));
        }
        if attachment.size() > self.max_bytes {
            return Err(format!(
                "{} is larger than {} MB",
                attachment.file_name,
                self.max_bytes / (1024 * 1024)
            ));
        }
        match attachment.extension() {
            Some(ext) if self.extensions.contains(&ext.as_str()) => Ok(()),
            _ => Err(format!(
                "{} must be one of: {}",
                attachment.file_name,
                self.extensions.join(", ")
            )),
        }
    }
}
