//! Agilent exports: two-column tab-delimited Time/Signal, UTF-16 encoded,
//! with no structured header. Channel and flow rate travel in the file name
//! (`Channel###`, `Flow<float>`); the sample name is what remains of the
//! base name once those tags and the `_RT` suffix are stripped.

use std::path::Path;

use crate::data::model::RawRecord;
use crate::error::{Error, Result};
use crate::parsers::{parse_float, warn_empty, ParsedFile};
use crate::resolver::{
    resolve_channel, resolve_flow_rate_from_name, MetadataProvider, ResolverSession,
};

/// Parse one Agilent file. `Ok(None)` means zero data rows (skipped).
pub fn parse(
    path: &Path,
    explicit_flow: Option<f64>,
    explicit_channel: Option<&str>,
    session: &mut ResolverSession,
    provider: &mut dyn MetadataProvider,
) -> Result<Option<ParsedFile>> {
    let bytes = std::fs::read(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let text = decode_utf16(path, &bytes)?;

    let mut points = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let line_no = i + 1;
        let mut fields = line.split('\t');
        let (time, signal) = match (fields.next(), fields.next()) {
            (Some(t), Some(s)) => (t, s),
            _ => {
                return Err(Error::Parse {
                    path: path.to_path_buf(),
                    reason: format!("line {line_no}: expected a Time/Signal pair"),
                })
            }
        };
        points.push((
            parse_float(time, path, line_no, "time")?,
            parse_float(signal, path, line_no, "signal")?,
        ));
    }
    if points.is_empty() {
        warn_empty(path);
        return Ok(None);
    }

    let mut sample = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .replace("_RT", "");

    let context = path.display().to_string();
    // Channel first, then flow rate; each strips its tag from the working
    // sample name before the name becomes the sample label.
    let channel = resolve_channel(explicit_channel, &mut sample, session, provider, &context)?;
    let flow_rate =
        resolve_flow_rate_from_name(explicit_flow, &mut sample, session, provider, &context)?;

    let records = points
        .into_iter()
        .map(|(time, signal)| RawRecord {
            time,
            signal,
            channel: channel.clone(),
            sample: sample.clone(),
        })
        .collect();

    Ok(Some(ParsedFile {
        path: path.to_path_buf(),
        records,
        flow_rate,
        run_label: None,
    }))
}

/// Decode UTF-16 with BOM detection, defaulting to little-endian.
fn decode_utf16(path: &Path, bytes: &[u8]) -> Result<String> {
    let bad = |reason: &str| Error::Parse {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let (body, big_endian) = match bytes {
        [0xFF, 0xFE, rest @ ..] => (rest, false),
        [0xFE, 0xFF, rest @ ..] => (rest, true),
        rest => (rest, false),
    };
    if body.len() % 2 != 0 {
        return Err(bad("odd byte count for UTF-16 content"));
    }

    let units: Vec<u16> = body
        .chunks_exact(2)
        .map(|pair| {
            if big_endian {
                u16::from_be_bytes([pair[0], pair[1]])
            } else {
                u16::from_le_bytes([pair[0], pair[1]])
            }
        })
        .collect();

    String::from_utf16(&units).map_err(|_| bad("invalid UTF-16 content"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{Answer, NonInteractive, ScriptedProvider};
    use std::io::Write;

    fn write_utf16le(dir: &tempfile::TempDir, name: &str, text: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut bytes = vec![0xFF, 0xFE];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(&bytes).unwrap();
        path
    }

    const BODY: &str = "0.0\t5.0\n0.5\t6.0\n1.0\t7.0\n";

    #[test]
    fn metadata_comes_from_the_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_utf16le(&dir, "S1_Channel280_Flow0.5_RT.CSV", BODY);
        let mut session = ResolverSession::new();

        let parsed = parse(&path, None, None, &mut session, &mut NonInteractive)
            .unwrap()
            .unwrap();

        assert_eq!(parsed.records.len(), 3);
        assert_eq!(parsed.records[0].channel, "280");
        assert_eq!(parsed.flow_rate, 0.5);
        // Both tags and the `_RT` suffix are gone from the sample label.
        assert_eq!(parsed.records[0].sample, "S1__");
        assert_eq!(parsed.records[1].signal, 6.0);
    }

    #[test]
    fn untagged_names_fall_back_to_the_provider() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_utf16le(&dir, "plain_name.CSV", BODY);
        let mut session = ResolverSession::new();
        let mut provider = ScriptedProvider::new(
            vec![Answer {
                value: 0.3,
                remember: true,
            }],
            vec![Answer {
                value: "UV1".to_string(),
                remember: true,
            }],
        );

        let parsed = parse(&path, None, None, &mut session, &mut provider)
            .unwrap()
            .unwrap();
        assert_eq!(parsed.records[0].channel, "UV1");
        assert_eq!(parsed.flow_rate, 0.3);
        // Confirmed answers cover the remaining files of the run.
        assert_eq!(session.channel_override.as_deref(), Some("UV1"));
        assert_eq!(session.flow_override, Some(0.3));
    }

    #[test]
    fn big_endian_bom_is_honoured() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("be_Channel280_Flow1.0.CSV");
        let mut bytes = vec![0xFE, 0xFF];
        for unit in BODY.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        std::fs::write(&path, &bytes).unwrap();
        let mut session = ResolverSession::new();

        let parsed = parse(&path, None, None, &mut session, &mut NonInteractive)
            .unwrap()
            .unwrap();
        assert_eq!(parsed.records.len(), 3);
        assert_eq!(parsed.flow_rate, 1.0);
    }
}
