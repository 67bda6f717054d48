//! Tagged field block shared by the built-in clients.
//!
//! ```text
//! <field_data>
//!     <field name='Transaction Number'>10827900900900</field>
//!     <field name='Port of Entry'>440</field>
//!     <field name='Cargo Control Number'>1234567890</field>
//!     <field name='ETA Date'>20230131</field>
//!     <field name='ETA Time'>1230</field>
//! </field_data>
//! ```

use std::fmt::Write;

use crate::client::types::Payload;
use crate::submission::ValidatedSubmission;

/// Workflow the built-in clients target downstream.
pub const WORKFLOW_ID: u32 = 101;

/// Rendered in place of an absent ETA date or time.
pub const NO_VALUE: &str = "None";

/// Build the `api_key` / `workflow` / `field_data` payload.
pub fn field_data_payload(api_key: &str, workflow: u32, submission: &ValidatedSubmission) -> Payload {
    let mut payload = Payload::new();
    payload.insert("api_key", api_key);
    payload.insert("workflow", workflow);
    payload.insert("field_data", render_field_data(submission));
    payload
}

pub fn render_field_data(submission: &ValidatedSubmission) -> String {
    let eta_date = submission
        .eta_date()
        .map(|d| d.format("%Y%m%d").to_string())
        .unwrap_or_else(|| NO_VALUE.to_string());
    let eta_time = submission
        .eta_time()
        .map(|t| t.format("%H%M").to_string())
        .unwrap_or_else(|| NO_VALUE.to_string());

    let entries = [
        ("Transaction Number", submission.transaction_number().to_string()),
        ("Port of Entry", submission.port_of_entry().to_string()),
        ("Cargo Control Number", submission.cargo_control_number().to_string()),
        ("ETA Date", eta_date),
        ("ETA Time", eta_time),
    ];

    let mut block = String::from("<field_data>\n");
    for (name, value) in entries {
        // Writing to a String cannot fail.
        let _ = writeln!(block, "    <field name='{}'>{}</field>", name, value);
    }
    block.push_str("</field_data>");
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submission::{fields, validate, FileUpload, RawSubmission};

    fn submission(ccd: &str, eta: Option<(&str, &str)>) -> ValidatedSubmission {
        let mut raw = RawSubmission::new()
            .with_field(fields::TRANS_NUM, "10827900900900")
            .with_field(fields::PORT_OF_ENTRY, "7")
            .with_field(fields::CCD_NUM, ccd)
            .with_file(FileUpload::from_bytes(&b"x"[..]));
        if let Some((date, time)) = eta {
            raw.insert_field(fields::ETA_DATE, date);
            raw.insert_field(fields::ETA_TIME, time);
        }
        validate(raw).unwrap()
    }

    #[test]
    fn test_absent_eta_renders_placeholder() {
        let block = render_field_data(&submission("ABCDE", None));
        assert!(block.contains("<field name='ETA Date'>None</field>"));
        assert!(block.contains("<field name='ETA Time'>None</field>"));
        assert_eq!(block.matches("<field name=").count(), 5);
    }

    #[test]
    fn test_port_rendered_without_padding() {
        let block = render_field_data(&submission("ABCDE", Some(("2024-02-29", "07:05"))));
        assert!(block.contains("<field name='Port of Entry'>7</field>"));
        assert!(block.contains("<field name='ETA Date'>20240229</field>"));
        assert!(block.contains("<field name='ETA Time'>0705</field>"));
    }

    #[test]
    fn test_ccd_inserted_as_submitted() {
        let block = render_field_data(&submission("A<B>&'C", None));
        assert!(block.contains("<field name='Cargo Control Number'>A<B>&'C</field>"));
    }

    #[test]
    fn test_payload_fields() {
        let payload = field_data_payload("key", WORKFLOW_ID, &submission("ABCDE", None));
        let names: Vec<_> = payload.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["api_key", "workflow", "field_data"]);
        assert_eq!(payload.get("workflow"), Some("101"));
    }
}
