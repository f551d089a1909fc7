//! Host-list expansion (SPEC_FULL.md §6.2): the `-f`/`-l`/`-r` flags are
//! additive, applied in the order given on the command line, and the
//! combined list is deduplicated keeping each host's first occurrence.

use std::fs;
use std::path::Path;

/// Reads one hostname per non-empty, non-comment line (`#` prefix) from a
/// file, the way the original's `-f` flag does.
pub fn read_host_file(path: &Path) -> std::io::Result<Vec<String>> {
    let contents = fs::read_to_string(path)?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Expands a `-r` range spec of the form `prefix[first-last,first2-last2,...]`
/// (SPEC_FULL.md §6.2) into the full list of hostnames, e.g.
/// `node[01-03,7-8]` -> `node01 node02 node03 node7 node8`. Each number in a
/// range is zero-padded to match the width of its own `first` as written.
pub fn expand_range(spec: &str) -> Result<Vec<String>, String> {
    let open = spec.find('[').ok_or_else(|| format!("not a range: {spec}"))?;
    if !spec.ends_with(']') {
        return Err(format!("range spec missing closing ']': {spec}"));
    }
    let prefix = &spec[..open];
    let body = &spec[open + 1..spec.len() - 1];
    if body.is_empty() {
        return Err(format!("empty range list: {spec}"));
    }

    let mut out = Vec::new();
    for part in body.split(',') {
        let dash = part.find('-').ok_or_else(|| format!("bad range segment: {part}"))?;
        let (start_digits, end_digits) = (&part[..dash], &part[dash + 1..]);
        let width = start_digits.len();
        let start: u64 = start_digits
            .parse()
            .map_err(|_| format!("bad range start in {spec}: {start_digits}"))?;
        let end: u64 = end_digits
            .parse()
            .map_err(|_| format!("bad range end in {spec}: {end_digits}"))?;
        if end < start {
            return Err(format!("range end before start: {part}"));
        }
        out.extend((start..=end).map(|n| format!("{prefix}{n:0width$}")));
    }
    Ok(out)
}

/// Merges multiple ordered host sources into one list, additive and
/// deduplicated on first occurrence.
pub fn merge_host_sources(sources: impl IntoIterator<Item = Vec<String>>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for source in sources {
        for host in source {
            if seen.insert(host.clone()) {
                out.push(host);
            }
        }
    }
    out
}
