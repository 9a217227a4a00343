//! CSV export of the submissions table.

use crate::protocol::Attachment;
use crate::types::Submission;

pub const EXPORT_FILENAME: &str = "submissions.csv";

const HEADER: [&str; 6] = [
    "User ID",
    "User name",
    "Submission URL",
    "User votes",
    "timestamp",
    "Message link",
];

/// Render submissions as CSV.
///
/// Message links are `<link_base>/<channel>/<message>` when a link base is
/// configured, and empty otherwise.
pub fn render_csv(
    submissions: &[Submission],
    link_base: Option<&str>,
    channel_id: &str,
) -> Result<String, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());

    writer.write_record(HEADER)?;
    for submission in submissions {
        let link = link_base
            .map(|base| format!("{}/{}/{}", base, channel_id, submission.message_id))
            .unwrap_or_default();
        let votes = submission.vote_count.to_string();
        let timestamp = submission.submitted_at.to_rfc3339();
        writer.write_record([
            submission.user_id.as_str(),
            submission.display_name.as_str(),
            submission.url.as_str(),
            votes.as_str(),
            timestamp.as_str(),
            link.as_str(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Build the CSV attachment, or `None` when there is nothing to export
pub fn csv_attachment(
    submissions: &[Submission],
    link_base: Option<&str>,
    channel_id: &str,
) -> Result<Option<Attachment>, csv::Error> {
    if submissions.is_empty() {
        return Ok(None);
    }
    Ok(Some(Attachment {
        filename: EXPORT_FILENAME.to_string(),
        content_type: "text/csv".to_string(),
        body: render_csv(submissions, link_base, channel_id)?,
    }))
}
