//! Speedwalk strings: run-length compressed direction sequences.
//!
//! `[n, n, e, e, e]` is written `"2n;3e"`. A run of one has no count.

use crate::{Direction, MapError};

/// Compresses a direction sequence into a speedwalk string.
///
/// ```
/// use mudlink_map::{compress_route, Direction::*};
///
/// assert_eq!(compress_route(&[North, North, East, East, East]), "2n;3e");
/// assert_eq!(compress_route(&[North]), "n");
/// assert_eq!(compress_route(&[]), "");
/// ```
pub fn compress_route(directions: &[Direction]) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut iter = directions.iter().peekable();
    while let Some(&dir) = iter.next() {
        let mut count = 1;
        while iter.next_if_eq(&&dir).is_some() {
            count += 1;
        }
        if count == 1 {
            parts.push(dir.token().to_string());
        } else {
            parts.push(format!("{count}{}", dir.token()));
        }
    }
    parts.join(";")
}

/// Expands a speedwalk string back into directions.
///
/// Segments are separated by `;`. Each segment is an optional repeat count
/// followed by a direction token, long or short (`"3north"`, `"ne"`). A
/// segment made only of single-letter tokens (`"3n2e"`, `"nnw"`) is read
/// one letter at a time, the way classic speedwalk aliases are written.
///
/// # Errors
/// [`MapError::InvalidRoute`] for a zero count or a count with no
/// direction; [`MapError::UnknownDirection`] for a token that is not a
/// direction.
pub fn parse_route(route: &str) -> Result<Vec<Direction>, MapError> {
    let mut out = Vec::new();
    for segment in route.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        let (count, token) = split_count(segment)?;
        match Direction::parse(token) {
            Some(dir) => out.extend(std::iter::repeat_n(dir, count)),
            None => parse_compact(segment, &mut out)?,
        }
    }
    Ok(out)
}

// Splits "12ne" into (12, "ne"); no digits means a count of one.
fn split_count(segment: &str) -> Result<(usize, &str), MapError> {
    let digits = segment.len() - segment.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return Ok((1, segment));
    }
    let (count, token) = segment.split_at(digits);
    let count: usize = count
        .parse()
        .map_err(|_| MapError::InvalidRoute(segment.to_string()))?;
    if count == 0 || token.trim().is_empty() {
        return Err(MapError::InvalidRoute(segment.to_string()));
    }
    Ok((count, token.trim()))
}

// "3n2e" or "nnw": digit runs followed by single-letter directions.
fn parse_compact(segment: &str, out: &mut Vec<Direction>) -> Result<(), MapError> {
    let mut count = 0usize;
    for c in segment.chars() {
        if let Some(d) = c.to_digit(10) {
            count = count
                .checked_mul(10)
                .and_then(|c| c.checked_add(d as usize))
                .ok_or_else(|| MapError::InvalidRoute(segment.to_string()))?;
            continue;
        }
        let dir = Direction::parse(c.encode_utf8(&mut [0; 4]))
            .ok_or_else(|| MapError::UnknownDirection(segment.to_string()))?;
        out.extend(std::iter::repeat_n(dir, count.max(1)));
        count = 0;
    }
    if count > 0 {
        return Err(MapError::InvalidRoute(segment.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use Direction::*;

    #[test]
    fn test_compress_runs() {
        assert_eq!(compress_route(&[North, North, East, East, East]), "2n;3e");
        assert_eq!(compress_route(&[North, East, North]), "n;e;n");
        assert_eq!(compress_route(&[Up, Up, NorthWest]), "2u;nw");
    }

    #[test]
    fn test_compress_single_and_empty() {
        assert_eq!(compress_route(&[North]), "n");
        assert_eq!(compress_route(&[]), "");
    }

    #[test]
    fn test_parse_route_segments() {
        assert_eq!(parse_route("2n;3e").unwrap(), vec![North, North, East, East, East]);
        assert_eq!(parse_route("north; 2 sw").unwrap(), vec![North, SouthWest, SouthWest]);
        assert_eq!(parse_route("").unwrap(), Vec::<Direction>::new());
    }

    #[test]
    fn test_parse_route_compact_form() {
        assert_eq!(parse_route("3n2e").unwrap(), vec![North, North, North, East, East]);
        assert_eq!(parse_route("nnw").unwrap(), vec![North, North, West]);
    }

    #[test]
    fn test_parse_route_inverts_compress() {
        let dirs = vec![South, South, Enter, Out, Out, Out, Down];
        assert_eq!(parse_route(&compress_route(&dirs)).unwrap(), dirs);
    }

    #[test]
    fn test_parse_route_errors() {
        assert!(matches!(parse_route("0n"), Err(MapError::InvalidRoute(_))));
        assert!(matches!(parse_route("3"), Err(MapError::InvalidRoute(_))));
        assert!(matches!(parse_route("2x"), Err(MapError::UnknownDirection(_))));
        assert!(matches!(parse_route("sideways"), Err(MapError::UnknownDirection(_))));
    }

    #[test]
    fn test_parse_route_huge_count_is_invalid() {
        let digits = "9".repeat(40);
        assert!(matches!(
            parse_route(&format!("n{digits}e")),
            Err(MapError::InvalidRoute(_))
        ));
        assert!(matches!(
            parse_route(&format!("{digits}n")),
            Err(MapError::InvalidRoute(_))
        ));
    }
}
