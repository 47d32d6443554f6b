// ABOUTME: Dotenv-style environment file parsing for container env vars.
// ABOUTME: Missing files are tolerated; malformed lines are skipped with a warning.

use std::io;
use std::path::Path;

/// Load `KEY=VALUE` lines from an env file.
///
/// A missing file is not an error: projects without secrets simply don't
/// ship one. Blank lines and `#` comments are ignored; lines without an
/// `=` are skipped with a warning.
pub fn load_env_file(path: Option<&Path>) -> io::Result<Vec<String>> {
    let Some(path) = path else {
        tracing::debug!("no env file configured");
        return Ok(Vec::new());
    };

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::warn!(
                "env file not found at {}, continuing without it",
                path.display()
            );
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    };

    let mut vars = Vec::new();
    for (number, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if !line.contains('=') {
            tracing::warn!(
                "skipping line {} in {}: missing '='",
                number + 1,
                path.display()
            );
            continue;
        }
        vars.push(line.to_string());
    }

    tracing::debug!("loaded {} variables from {}", vars.len(), path.display());
    Ok(vars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_empty() {
        let vars = load_env_file(Some(Path::new("/nonexistent/.env"))).unwrap();
        assert!(vars.is_empty());
    }

    #[test]
    fn parses_and_filters_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env.development");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "# comment").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "DATABASE_URL=postgres://localhost/db").unwrap();
        writeln!(file, "not-a-pair").unwrap();
        writeln!(file, "  API_KEY=secret  ").unwrap();

        let vars = load_env_file(Some(&path)).unwrap();
        assert_eq!(
            vars,
            vec![
                "DATABASE_URL=postgres://localhost/db".to_string(),
                "API_KEY=secret".to_string(),
            ]
        );
    }
}
