//! Report delivery through a local sendmail-compatible command.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use stackreport_config::MailSettings;
use stackreport_core::ReportError;

const SEND_TIMEOUT: Duration = Duration::from_secs(60);

/// RFC 5322 message with the report as plain-text body.
pub fn compose_message(settings: &MailSettings, body: &str) -> String {
    format!(
        "From: {}\nTo: {}\nSubject: {}\nContent-Type: text/plain; charset=utf-8\n\n{}\n",
        settings.from,
        settings.to.join(", "),
        settings.subject,
        body
    )
}

/// Pipe the message into `settings.sendmail -t`.
///
/// The command string may carry extra arguments (`"/usr/sbin/sendmail -oi"`).
pub async fn send_report(settings: &MailSettings, body: &str) -> Result<(), ReportError> {
    if settings.to.is_empty() {
        return Err(ReportError::MailError("no recipients configured (mail.to)".into()));
    }

    let mut parts = settings.sendmail.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| ReportError::MailError("empty sendmail command".into()))?;

    let mut child = Command::new(program)
        .args(parts)
        .arg("-t")
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ReportError::MailError(format!("failed to start {program}: {e}")))?;

    let message = compose_message(settings, body);
    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| ReportError::MailError("sendmail stdin unavailable".into()))?;
    stdin
        .write_all(message.as_bytes())
        .await
        .map_err(|e| ReportError::MailError(format!("failed to write message: {e}")))?;
    drop(stdin);
    debug!(bytes = message.len(), program = %program, "Message handed to sendmail");

    let output = tokio::time::timeout(SEND_TIMEOUT, child.wait_with_output())
        .await
        .map_err(|_| ReportError::MailError(format!("{program} timed out after {}s", SEND_TIMEOUT.as_secs())))?
        .map_err(|e| ReportError::MailError(e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ReportError::MailError(format!(
            "{program} exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    info!(recipients = settings.to.len(), subject = %settings.subject, "Report mailed");
    Ok(())
}
