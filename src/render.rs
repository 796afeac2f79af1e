use std::io::{self, BufRead, Write};

use tracing::debug;

/// One raw match line from grep or git grep.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GrepLine<'a> {
    pub path: &'a str,
    pub line: u64,
    pub text: &'a str,
}

/// Parse `path\0lineno:text` (grep `-Z`) or `path:lineno:text`.
pub fn parse_line(raw: &str) -> Option<GrepLine<'_>> {
    if let Some((path, rest)) = raw.split_once('\0') {
        let (number, text) = rest.split_once(':')?;
        return Some(GrepLine {
            path,
            line: number.parse().ok()?,
            text,
        });
    }

    // Paths may contain ':'; take the first `:<digits>:` boundary.
    for (idx, _) in raw.match_indices(':') {
        let rest = &raw[idx + 1..];
        let (number, text) = rest.split_once(':')?;
        if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        let Ok(line) = number.parse() else {
            continue;
        };
        return Some(GrepLine {
            path: &raw[..idx],
            line,
            text,
        });
    }
    None
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub files: usize,
    pub matches: usize,
    pub passthrough: usize,
}

/// Group raw match lines by file. Stops quietly when the reader of `output`
/// goes away.
pub fn reformat<R: BufRead, W: Write>(
    input: R,
    output: W,
    query: &str,
) -> io::Result<RenderStats> {
    match render_lines(input, output) {
        Ok(stats) => {
            debug!(
                target: "ndl::render",
                query,
                files = stats.files,
                matches = stats.matches,
                "rendered results"
            );
            Ok(stats)
        }
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => Ok(RenderStats::default()),
        Err(err) => Err(err),
    }
}

fn render_lines<R: BufRead, W: Write>(mut input: R, mut output: W) -> io::Result<RenderStats> {
    let mut stats = RenderStats::default();
    let mut current: Option<String> = None;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let raw = String::from_utf8_lossy(&buf);
        let raw = raw.trim_end_matches(['\n', '\r']);

        let Some(hit) = parse_line(raw) else {
            writeln!(output, "{}", raw.replace('\0', ":"))?;
            stats.passthrough += 1;
            continue;
        };

        let path = hit.path.strip_prefix("./").unwrap_or(hit.path);
        if current.as_deref() != Some(path) {
            if current.is_some() {
                writeln!(output)?;
            }
            writeln!(output, "{path}")?;
            current = Some(path.to_string());
            stats.files += 1;
        }
        writeln!(output, "{}: {}", hit.line, hit.text)?;
        stats.matches += 1;
    }

    output.flush()?;
    Ok(stats)
}
