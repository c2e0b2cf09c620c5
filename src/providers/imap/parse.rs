//! RFC 822 message parsing into [`MessageDigest`].

use chrono::{DateTime, Utc};
use mailparse::{DispositionType, MailHeaderMap, ParsedMail};

use super::{FetchedMessage, Result, SessionError};
use crate::domain::MessageDigest;

/// Renders HTML to plain text with tags stripped and entities decoded.
pub fn html_to_text(html: &str) -> String {
    nanohtml2text::html2text(html).trim().to_string()
}

/// Builds a digest from a fetched message.
///
/// Headers are RFC 2047-decoded. Attachment parts are ignored; every other
/// `text/plain` part is concatenated into `body_text` and every `text/html`
/// part is rendered and concatenated into `body_html`.
pub fn parse_digest(message: &FetchedMessage) -> Result<MessageDigest> {
    let mail = mailparse::parse_mail(&message.raw).map_err(|e| SessionError::Parse {
        uid: message.uid,
        reason: e.to_string(),
    })?;

    let header = |name: &str| mail.headers.get_first_value(name).unwrap_or_default();

    let received = message
        .internal_date
        .or_else(|| header_date(&mail.headers.get_first_value("Date")?));

    let mut plain = Vec::new();
    let mut html = Vec::new();
    collect_bodies(&mail, &mut plain, &mut html);

    Ok(MessageDigest {
        uid: message.uid,
        subject: header("Subject"),
        from: header("From"),
        to: header("To"),
        received,
        body_text: plain.join("\n\n").trim().to_string(),
        body_html: if html.is_empty() {
            None
        } else {
            Some(html.join("\n\n").trim().to_string())
        },
    })
}

fn header_date(value: &str) -> Option<DateTime<Utc>> {
    let timestamp = mailparse::dateparse(value).ok()?;
    DateTime::from_timestamp(timestamp, 0)
}

fn collect_bodies(part: &ParsedMail<'_>, plain: &mut Vec<String>, html: &mut Vec<String>) {
    if !part.subparts.is_empty() {
        for sub in &part.subparts {
            collect_bodies(sub, plain, html);
        }
        return;
    }

    if part.get_content_disposition().disposition == DispositionType::Attachment {
        return;
    }

    let body = match part.get_body() {
        Ok(body) => body,
        Err(e) => {
            tracing::debug!(error = %e, mimetype = %part.ctype.mimetype, "undecodable body part");
            return;
        }
    };

    match part.ctype.mimetype.to_ascii_lowercase().as_str() {
        "text/plain" => plain.push(body),
        "text/html" => html.push(html_to_text(&body)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Uid;
    use chrono::TimeZone;

    fn fetched(raw: &str) -> FetchedMessage {
        FetchedMessage {
            uid: Uid(7),
            raw: raw.replace('\n', "\r\n").into_bytes(),
            internal_date: None,
        }
    }

    #[test]
    fn simple_plain_message() {
        let msg = fetched(
            "Subject: Weekly deals\n\
             From: Promo <deals@promo.example>\n\
             To: me@example.com\n\
             Date: Tue, 06 Feb 2024 10:00:00 +0000\n\
             \n\
             Buy now\n",
        );

        let digest = parse_digest(&msg).unwrap();
        assert_eq!(digest.uid, Uid(7));
        assert_eq!(digest.subject, "Weekly deals");
        assert_eq!(digest.from, "Promo <deals@promo.example>");
        assert_eq!(digest.to, "me@example.com");
        assert_eq!(digest.body_text, "Buy now");
        assert_eq!(digest.body_html, None);
        assert_eq!(
            digest.received,
            Some(Utc.with_ymd_and_hms(2024, 2, 6, 10, 0, 0).unwrap())
        );
    }

    #[test]
    fn encoded_subject_is_decoded() {
        let msg = fetched("Subject: =?UTF-8?B?44K744O844Or?=\n\nbody\n");
        let digest = parse_digest(&msg).unwrap();
        assert_eq!(digest.subject, "セール");
    }

    #[test]
    fn missing_headers_are_empty() {
        let digest = parse_digest(&fetched("\nonly a body\n")).unwrap();
        assert_eq!(digest.subject, "");
        assert_eq!(digest.from, "");
        assert_eq!(digest.received, None);
    }

    #[test]
    fn internal_date_wins_over_header() {
        let mut msg = fetched("Date: Tue, 06 Feb 2024 10:00:00 +0000\n\nx\n");
        let internal = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        msg.internal_date = Some(internal);
        assert_eq!(parse_digest(&msg).unwrap().received, Some(internal));
    }

    #[test]
    fn multipart_collects_text_and_html_skipping_attachments() {
        let msg = fetched(
            "Subject: mixed\n\
             Content-Type: multipart/mixed; boundary=\"outer\"\n\
             \n\
             --outer\n\
             Content-Type: multipart/alternative; boundary=\"inner\"\n\
             \n\
             --inner\n\
             Content-Type: text/plain; charset=utf-8\n\
             \n\
             plain part\n\
             --inner\n\
             Content-Type: text/html; charset=utf-8\n\
             \n\
             <p>Hello <b>there</b></p>\n\
             --inner--\n\
             --outer\n\
             Content-Type: text/plain\n\
             Content-Disposition: attachment; filename=\"notes.txt\"\n\
             \n\
             attached secret\n\
             --outer--\n",
        );

        let digest = parse_digest(&msg).unwrap();
        assert!(digest.body_text.contains("plain part"));
        assert!(!digest.body_text.contains("attached secret"));
        let html = digest.body_html.unwrap();
        assert!(html.contains("Hello"));
        assert!(html.contains("there"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn plain_body_is_trimmed() {
        let digest = parse_digest(&fetched("Subject: x\n\n\n\n   Buy now  \n\n\n")).unwrap();
        assert_eq!(digest.body_text, "Buy now");

        let anchored = regex::Regex::new("^Buy now$").unwrap();
        assert!(anchored.is_match(&digest.body_text));
    }

    #[test]
    fn html_to_text_strips_tags() {
        let text = html_to_text("<html><body><p>Unsubscribe &amp; save</p></body></html>");
        assert_eq!(text, "Unsubscribe & save");
    }
}
