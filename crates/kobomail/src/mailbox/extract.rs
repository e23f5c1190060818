//! Attachment discovery and extraction.

use std::collections::HashSet;
use std::path::Path;

use log::{debug, info};
use mail_parser::{Message, MessagePart, MimeHeaders, PartType};
use tokio::io::AsyncWriteExt;

use super::error::Result;

/// Kobo-specific EPUB packaging.
const KEPUB_EXTENSION: &str = "kepub";

/// Appended to `.kepub` files so the device treats them as EPUB.
const KEPUB_SUFFIX: &str = ".epub";

/// Permission bits for written attachments.
#[cfg(unix)]
const ATTACHMENT_MODE: u32 = 0o644;

/// Set of file extensions that are downloaded.
///
/// Entries are stored lowercase without a leading dot and membership is
/// case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedExtensions {
    extensions: HashSet<String>,
}

impl AllowedExtensions {
    /// Creates the set from configured entries such as `"epub"` or `".PDF"`.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = entries
            .into_iter()
            .map(|e| normalize_extension(e.as_ref()))
            .filter(|e| !e.is_empty())
            .collect();
        Self { extensions }
    }

    /// Checks whether `extension` is allowed.
    pub fn contains(&self, extension: &str) -> bool {
        self.extensions.contains(&normalize_extension(extension))
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }
}

/// An attachment part found while walking a message.
///
/// The content is only copied out of the message when [`content`] is
/// called, so parts that are skipped are never buffered.
///
/// [`content`]: AttachmentPart::content
#[derive(Debug)]
pub struct AttachmentPart<'a> {
    /// The attachment's filename, made safe for the library filesystem.
    pub filename: String,
    /// Extension as given by the filename, without the dot.
    pub extension: String,
    part: &'a MessagePart<'a>,
}

impl AttachmentPart<'_> {
    /// Returns the decoded bytes of the attachment.
    pub fn content(&self) -> Vec<u8> {
        match &self.part.body {
            PartType::Binary(data) | PartType::InlineBinary(data) => data.to_vec(),
            PartType::Text(text) | PartType::Html(text) => text.as_bytes().to_vec(),
            PartType::Message(message) => message.raw_message().to_vec(),
            _ => Vec::new(),
        }
    }

    /// Returns the name the attachment is written under.
    pub fn target_filename(&self) -> String {
        if self.extension.eq_ignore_ascii_case(KEPUB_EXTENSION) {
            format!("{}{}", self.filename, KEPUB_SUFFIX)
        } else {
            self.filename.clone()
        }
    }
}

/// Lazily walks the parts of `message`, yielding the ones classified as
/// attachments that carry a filename.
pub fn attachment_parts<'a>(
    message: &'a Message<'a>,
) -> impl Iterator<Item = AttachmentPart<'a>> + 'a {
    message.parts.iter().filter_map(|part| {
        if !is_attachment(part) {
            return None;
        }

        let raw_name = part
            .attachment_name()
            .or_else(|| part.content_type().and_then(|ct| ct.attribute("name")))?;

        let filename = sanitize_filename(raw_name);
        if filename.is_empty() {
            debug!("Skipping attachment with unusable filename {:?}", raw_name);
            return None;
        }

        let extension = Path::new(&filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_string();

        Some(AttachmentPart {
            filename,
            extension,
            part,
        })
    })
}

/// Writes every allowed attachment of `message` into `destination`.
///
/// Returns the number of files written. A write failure stops the walk;
/// files written before it are left in place.
pub async fn save_attachments(
    message: &Message<'_>,
    allowed: &AllowedExtensions,
    destination: &Path,
) -> Result<usize> {
    tokio::fs::create_dir_all(destination).await?;

    let mut written = 0;
    for attachment in attachment_parts(message) {
        if !allowed.contains(&attachment.extension) {
            debug!(
                "Attachment '{}' has extension '{}' which is not allowed",
                attachment.filename, attachment.extension
            );
            continue;
        }

        let path = destination.join(attachment.target_filename());
        debug!("Downloading attachment to {}", path.display());

        let content = attachment.content();
        write_attachment(&path, &content).await?;

        info!(
            "Successfully downloaded attachment '{}' ({} bytes)",
            attachment.target_filename(),
            content.len()
        );
        written += 1;
    }

    Ok(written)
}

async fn write_attachment(path: &Path, content: &[u8]) -> Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(ATTACHMENT_MODE);

    let mut file = options.open(path).await?;
    file.write_all(content).await?;
    file.flush().await?;
    Ok(())
}

/// Checks if a message part is an attachment.
///
/// An explicit `Content-Disposition` decides. Without one, anything that
/// is not a text body, a multipart container or an embedded message is
/// treated as an attachment.
fn is_attachment(part: &MessagePart) -> bool {
    if let Some(disposition) = part.content_disposition() {
        if disposition.ctype().eq_ignore_ascii_case("attachment") {
            return true;
        }
        if disposition.ctype().eq_ignore_ascii_case("inline") {
            return false;
        }
    }

    if matches!(part.body, PartType::Multipart(_) | PartType::Message(_)) {
        return false;
    }

    match part.content_type() {
        Some(ct) => {
            let ctype = ct.ctype();
            !(ctype.eq_ignore_ascii_case("text")
                || ctype.eq_ignore_ascii_case("multipart")
                || ctype.eq_ignore_ascii_case("message"))
        }
        None => false,
    }
}

fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_lowercase()
}

/// Longest filename most filesystems accept, in bytes.
const MAX_FILENAME_LEN: usize = 255;

/// Longest extension kept when a filename is shortened, dot included.
const MAX_EXTENSION_LEN: usize = 50;

/// Makes a filename safe to write into the library folder.
///
/// Path separators and characters rejected by FAT filesystems are
/// replaced, leading/trailing dots and spaces are removed.
fn sanitize_filename(filename: &str) -> String {
    let filename = filename
        .chars()
        .map(|c| match c {
            '/' | '\\' | '<' | '>' | ':' | '"' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>();

    let filename = filename.trim_matches(|c| c == '.' || c == ' ');

    if filename.len() <= MAX_FILENAME_LEN {
        return filename.to_string();
    }

    // An overlong "extension" is cut like the rest of the name.
    let ext = match filename.rfind('.') {
        Some(dot) if filename.len() - dot <= MAX_EXTENSION_LEN => &filename[dot..],
        _ => "",
    };
    let mut cut = MAX_FILENAME_LEN - ext.len();
    while !filename.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}{}", &filename[..cut], ext)
}
