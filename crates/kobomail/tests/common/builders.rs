//! Builders for raw test messages.

#![allow(dead_code)]

const BOUNDARY: &str = "kobomail-test-boundary";

struct Attachment {
    filename: String,
    content_type: String,
    disposition: &'static str,
    content: String,
}

/// Builds an RFC 5322 message with a text body and attachments.
pub struct EmailBuilder {
    from: Option<String>,
    to: String,
    subject: String,
    attachments: Vec<Attachment>,
}

impl EmailBuilder {
    pub fn new() -> Self {
        Self {
            from: Some("Jane Reader <jane@example.com>".to_string()),
            to: "reader+kobo@example.com".to_string(),
            subject: "Send to kobo".to_string(),
            attachments: Vec::new(),
        }
    }

    pub fn to(mut self, to: &str) -> Self {
        self.to = to.to_string();
        self
    }

    pub fn subject(mut self, subject: &str) -> Self {
        self.subject = subject.to_string();
        self
    }

    pub fn without_sender(mut self) -> Self {
        self.from = None;
        self
    }

    /// Adds an attachment part with `Content-Disposition: attachment`.
    pub fn attachment(mut self, filename: &str, content: &str) -> Self {
        self.attachments.push(Attachment {
            filename: filename.to_string(),
            content_type: "application/octet-stream".to_string(),
            disposition: "attachment",
            content: content.to_string(),
        });
        self
    }

    /// Adds an inline part, which is never saved.
    pub fn inline(mut self, filename: &str, content_type: &str, content: &str) -> Self {
        self.attachments.push(Attachment {
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            disposition: "inline",
            content: content.to_string(),
        });
        self
    }

    pub fn recipient(&self) -> &str {
        &self.to
    }

    pub fn subject_line(&self) -> &str {
        &self.subject
    }

    pub fn build(&self) -> Vec<u8> {
        let mut raw = String::new();
        if let Some(from) = &self.from {
            raw.push_str(&format!("From: {}\r\n", from));
        }
        raw.push_str(&format!("To: {}\r\n", self.to));
        raw.push_str(&format!("Subject: {}\r\n", self.subject));
        raw.push_str("Date: Tue, 1 Jul 2003 10:52:37 +0200\r\n");
        raw.push_str("MIME-Version: 1.0\r\n");
        raw.push_str(&format!(
            "Content-Type: multipart/mixed; boundary=\"{}\"\r\n\r\n",
            BOUNDARY
        ));

        raw.push_str(&format!("--{}\r\n", BOUNDARY));
        raw.push_str("Content-Type: text/plain; charset=utf-8\r\n\r\n");
        raw.push_str("Sent from my phone\r\n");

        for attachment in &self.attachments {
            raw.push_str(&format!("--{}\r\n", BOUNDARY));
            raw.push_str(&format!("Content-Type: {}\r\n", attachment.content_type));
            raw.push_str(&format!(
                "Content-Disposition: {}; filename=\"{}\"\r\n\r\n",
                attachment.disposition, attachment.filename
            ));
            raw.push_str(&attachment.content);
            raw.push_str("\r\n");
        }

        raw.push_str(&format!("--{}--\r\n", BOUNDARY));
        raw.into_bytes()
    }
}

impl Default for EmailBuilder {
    fn default() -> Self {
        Self::new()
    }
}
