use crate::error::ParseError;
use crate::types::PoseSample;
use std::fmt;

// -- Request framing --

/// Line terminator expected by the legacy server, independent of host platform.
pub const LINE_TERMINATOR: &str = "\r\n";
/// Separator between opcode and job id in a request line.
pub const REQUEST_SEPARATOR: char = ';';

// -- Legacy datagram geometry --
// Field layout: [0:type, 1:timestamp, 2-4:reserved, 5:x, 6:y, 7:z, 8:gamma, 9:beta, 10:alpha]

pub const MIN_FIELDS: usize = 3;
pub const POSITION_FIELDS: usize = 8;
pub const ORIENTATION_FIELDS: usize = 11;
const X_INDEX: usize = 5;
const GAMMA_INDEX: usize = 8;

/// Build a request line: `<opcode>;<job_id>\r\n`.
pub fn build_request(opcode: &str, job_id: &str) -> String {
    let mut line = String::with_capacity(opcode.len() + job_id.len() + 3);
    line.push_str(opcode);
    line.push(REQUEST_SEPARATOR);
    line.push_str(job_id);
    line.push_str(LINE_TERMINATOR);
    line
}

/// Terminate an arbitrary outbound message with the protocol line ending.
///
/// Any line ending already present is replaced, so `"abc\n"` and `"abc"`
/// both go out as `"abc\r\n"`.
pub fn frame_message(msg: &str) -> String {
    let mut line = strip_line_ending(msg).to_string();
    line.push_str(LINE_TERMINATOR);
    line
}

/// Remove any trailing `\r` / `\n` characters.
pub fn strip_line_ending(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}

/// One decoded line of the legacy vision protocol.
///
/// Coordinates default to zero when the line is too short to carry them, so
/// check [`has_pose`](Self::has_pose) before trusting them.
#[derive(Debug, Clone, PartialEq)]
pub struct VisionDatagram {
    /// First field, kept verbatim.
    pub operation_type: String,
    /// Number of fields after splitting (trailing empty fields dropped).
    pub field_count: usize,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub gamma: f64,
    pub beta: f64,
    pub alpha: f64,
}

impl VisionDatagram {
    /// Parse a raw line. Equivalent to [`parse_datagram`].
    pub fn parse(line: &str, delimiter: &str) -> Result<Self, ParseError> {
        parse_datagram(line, delimiter)
    }

    /// The line carried x, y, z.
    pub fn has_pose(&self) -> bool {
        self.field_count >= POSITION_FIELDS
    }

    /// The line also carried gamma, beta, alpha.
    pub fn has_orientation(&self) -> bool {
        self.field_count >= ORIENTATION_FIELDS
    }

    /// Convert to a pose sample, or `None` if the line had no coordinates.
    ///
    /// gamma/beta/alpha are the rotations about X/Y/Z respectively.
    pub fn to_pose_sample(&self) -> Option<PoseSample> {
        if !self.has_pose() {
            return None;
        }
        Some(PoseSample {
            x: self.x,
            y: self.y,
            z: self.z,
            rx: self.gamma,
            ry: self.beta,
            rz: self.alpha,
        })
    }
}

impl fmt::Display for VisionDatagram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "VisionDatagram[type={}, x={}, y={}, z={}, gamma={}, beta={}, alpha={}, fields={}]",
            self.operation_type,
            self.x,
            self.y,
            self.z,
            self.gamma,
            self.beta,
            self.alpha,
            self.field_count
        )
    }
}

/// Parse a legacy delimiter-separated datagram.
///
/// Rules:
/// - a trailing line ending is ignored; an otherwise empty line is rejected
/// - trailing empty fields are dropped before counting
/// - fewer than 3 fields is rejected
/// - 8+ fields: fields 5..=7 are x, y, z
/// - 11+ fields: fields 8..=10 are gamma, beta, alpha, otherwise they stay 0.0
/// - any non-numeric or non-finite coordinate rejects the whole line
pub fn parse_datagram(line: &str, delimiter: &str) -> Result<VisionDatagram, ParseError> {
    if delimiter.is_empty() {
        return Err(ParseError::EmptyDelimiter);
    }
    let line = strip_line_ending(line);
    if line.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut tokens: Vec<&str> = line.split(delimiter).collect();
    while tokens.last().is_some_and(|t| t.is_empty()) {
        tokens.pop();
    }
    if tokens.len() < MIN_FIELDS {
        return Err(ParseError::TooFewFields {
            found: tokens.len(),
        });
    }

    let mut datagram = VisionDatagram {
        operation_type: tokens[0].to_string(),
        field_count: tokens.len(),
        x: 0.0,
        y: 0.0,
        z: 0.0,
        gamma: 0.0,
        beta: 0.0,
        alpha: 0.0,
    };

    if tokens.len() >= POSITION_FIELDS {
        let [x, y, z] = parse_triple(&tokens, X_INDEX)?;
        datagram.x = x;
        datagram.y = y;
        datagram.z = z;

        if tokens.len() >= ORIENTATION_FIELDS {
            let [gamma, beta, alpha] = parse_triple(&tokens, GAMMA_INDEX)?;
            datagram.gamma = gamma;
            datagram.beta = beta;
            datagram.alpha = alpha;
        }
    }

    Ok(datagram)
}

/// Parse an optional line; `None` is treated like an empty line.
pub fn parse_datagram_opt(
    line: Option<&str>,
    delimiter: &str,
) -> Result<VisionDatagram, ParseError> {
    parse_datagram(line.unwrap_or(""), delimiter)
}

fn parse_triple(tokens: &[&str], start: usize) -> Result<[f64; 3], ParseError> {
    let mut out = [0.0; 3];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = parse_field(tokens, start + i)?;
    }
    Ok(out)
}

fn parse_field(tokens: &[&str], index: usize) -> Result<f64, ParseError> {
    let token = tokens.get(index).copied().unwrap_or("");
    token
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ParseError::InvalidNumber {
            index,
            token: token.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request_exact_bytes() {
        let req = build_request("15", "BIEMH26_105055");
        assert_eq!(req.as_bytes(), b"15;BIEMH26_105055\r\n");
    }

    #[test]
    fn test_frame_message_replaces_line_ending() {
        assert_eq!(frame_message("PING"), "PING\r\n");
        assert_eq!(frame_message("PING\n"), "PING\r\n");
        assert_eq!(frame_message("PING\r\n"), "PING\r\n");
    }

    #[test]
    fn test_parse_full_datagram() {
        let values = [12.5, -340.25, 87.0, 0.0123, -1.5707963267948966, 3.141592653589793];
        let line = format!(
            "PICK,1700000000,0,0,0,{},{},{},{},{},{}",
            values[0], values[1], values[2], values[3], values[4], values[5]
        );
        let d = parse_datagram(&line, ",").unwrap();
        assert_eq!(d.operation_type, "PICK");
        assert_eq!(d.field_count, 11);
        assert!(d.has_pose());
        assert!(d.has_orientation());
        assert_eq!(
            [d.x, d.y, d.z, d.gamma, d.beta, d.alpha],
            values,
            "values must survive parsing exactly"
        );
    }

    #[test]
    fn test_parse_rejects_short_input() {
        assert_eq!(parse_datagram("", ","), Err(ParseError::Empty));
        assert_eq!(parse_datagram_opt(None, ","), Err(ParseError::Empty));
        assert_eq!(
            parse_datagram("a,b", ","),
            Err(ParseError::TooFewFields { found: 2 })
        );
        assert_eq!(parse_datagram("\r\n", ","), Err(ParseError::Empty));
    }

    #[test]
    fn test_parse_rejects_empty_delimiter() {
        assert_eq!(parse_datagram("a,b,c", ""), Err(ParseError::EmptyDelimiter));
    }

    #[test]
    fn test_parse_missing_angles_default_to_zero() {
        let d = parse_datagram("PICK;0;0;0;0;1.5;2.5;3.5", ";").unwrap();
        assert!(d.has_pose());
        assert!(!d.has_orientation());
        assert_eq!((d.x, d.y, d.z), (1.5, 2.5, 3.5));
        assert_eq!((d.gamma, d.beta, d.alpha), (0.0, 0.0, 0.0));
    }

    #[test]
    fn test_parse_header_only_has_no_pose() {
        let d = parse_datagram("STATUS,OK,ready", ",").unwrap();
        assert_eq!(d.operation_type, "STATUS");
        assert!(!d.has_pose());
        assert_eq!(d.to_pose_sample(), None);
    }

    #[test]
    fn test_parse_rejects_bad_number() {
        let err = parse_datagram("PICK,0,0,0,0,1.0,abc,3.0", ",").unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidNumber {
                index: 6,
                token: "abc".into()
            }
        );
        // Garbage in the angle block rejects the whole line too.
        assert!(parse_datagram("PICK,0,0,0,0,1,2,3,x,0,0", ",").is_err());
        assert!(parse_datagram("PICK,0,0,0,0,NaN,2,3", ",").is_err());
    }

    #[test]
    fn test_parse_drops_trailing_empty_fields_and_line_ending() {
        let d = parse_datagram("PICK,0,0,0,0,1,2,3,,,\r\n", ",").unwrap();
        assert_eq!(d.field_count, 8);
        assert!(d.has_pose());
        assert!(!d.has_orientation());
        assert!(parse_datagram("a,b,,,", ",").is_err());
    }

    #[test]
    fn test_parse_tolerates_padded_numbers() {
        let d = parse_datagram("PICK, 0, 0, 0, 0, 1.0 , 2.0, 3.0", ",").unwrap();
        assert_eq!((d.x, d.y, d.z), (1.0, 2.0, 3.0));
    }

    #[test]
    fn test_to_pose_sample_maps_angles() {
        let d = parse_datagram("PICK,0,0,0,0,1,2,3,0.1,0.2,0.3", ",").unwrap();
        let p = d.to_pose_sample().unwrap();
        assert_eq!(p, PoseSample::new(1.0, 2.0, 3.0, 0.1, 0.2, 0.3));
    }

    #[test]
    fn test_multichar_delimiter() {
        let d = parse_datagram("T||1||2", "||").unwrap();
        assert_eq!(d.operation_type, "T");
        assert_eq!(d.field_count, 3);
    }
}
