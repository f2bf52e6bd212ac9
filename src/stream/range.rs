// HTTP Range header parsing for single byte ranges.

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ParsedRange {
    StartEnd {
        start: u64,
        end_inclusive: Option<u64>,
    },
    Suffix {
        len: u64,
    },
}

impl ParsedRange {
    /// Clamp against a resource of `total` bytes, returning `[start, end)`.
    /// `None` means the range is not satisfiable.
    pub fn resolve(self, total: u64) -> Option<(u64, u64)> {
        match self {
            ParsedRange::StartEnd {
                start,
                end_inclusive: Some(end),
            } => {
                // Inclusive end in HTTP Range → exclusive end here.
                let end = end.saturating_add(1).min(total);
                if start >= total || end <= start {
                    None
                } else {
                    Some((start, end))
                }
            }
            ParsedRange::StartEnd {
                start,
                end_inclusive: None,
            } => {
                if start >= total {
                    None
                } else {
                    Some((start, total))
                }
            }
            ParsedRange::Suffix { len } => {
                if total == 0 {
                    None
                } else {
                    Some((total.saturating_sub(len), total))
                }
            }
        }
    }
}

/// Parse a Range header value.
/// Supports:
/// - bytes=start-end
/// - bytes=start-
/// - bytes=-suffix_len
///
/// Multi-range requests are not supported and parse as `None`.
pub fn parse_range_header(value: &str) -> Option<ParsedRange> {
    let value = value.trim();
    let rest = value.strip_prefix("bytes=")?;
    let mut parts = rest.splitn(2, '-');
    let start_str = parts.next()?.trim();
    let end_str = parts.next()?.trim();

    if start_str.is_empty() {
        let len: u64 = end_str.parse().ok()?;
        if len == 0 {
            return None;
        }
        Some(ParsedRange::Suffix { len })
    } else {
        let start: u64 = start_str.parse().ok()?;
        let end_inclusive = if end_str.is_empty() {
            None
        } else {
            Some(end_str.parse::<u64>().ok()?)
        };
        Some(ParsedRange::StartEnd {
            start,
            end_inclusive,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range_header_full() {
        let result = parse_range_header("bytes=0-1023");
        assert!(matches!(
            result,
            Some(ParsedRange::StartEnd {
                start: 0,
                end_inclusive: Some(1023)
            })
        ));
    }

    #[test]
    fn test_parse_range_header_open_ended() {
        let result = parse_range_header("bytes=500-");
        assert!(matches!(
            result,
            Some(ParsedRange::StartEnd {
                start: 500,
                end_inclusive: None
            })
        ));
    }

    #[test]
    fn test_parse_range_header_suffix() {
        let result = parse_range_header("bytes=-1024");
        assert!(matches!(result, Some(ParsedRange::Suffix { len: 1024 })));
    }

    #[test]
    fn test_parse_range_header_invalid() {
        assert_eq!(parse_range_header("invalid"), None);
        assert_eq!(parse_range_header("bytes=abc-def"), None);
        assert_eq!(parse_range_header("bytes=0-1,4-5"), None);
        assert_eq!(parse_range_header("bytes=-0"), None);
    }

    #[test]
    fn test_resolve_clamps_to_total() {
        let range = parse_range_header("bytes=90-200").unwrap();
        assert_eq!(range.resolve(100), Some((90, 100)));

        let range = parse_range_header("bytes=10-").unwrap();
        assert_eq!(range.resolve(100), Some((10, 100)));

        let range = parse_range_header("bytes=-500").unwrap();
        assert_eq!(range.resolve(100), Some((0, 100)));
    }

    #[test]
    fn test_resolve_unsatisfiable() {
        assert_eq!(parse_range_header("bytes=100-").unwrap().resolve(100), None);
        assert_eq!(parse_range_header("bytes=50-10").unwrap().resolve(100), None);
        assert_eq!(parse_range_header("bytes=-10").unwrap().resolve(0), None);
    }
}
