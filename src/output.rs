use anyhow::Context;

/// Write a CSV file with the given header and one `Display`-rendered row
/// per record, creating parent directories as needed.
pub fn write_csv<R: std::fmt::Display>(
    path: &std::path::Path,
    header: &str,
    rows: &[R],
) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }
    let mut contents = String::from(header);
    contents.push('\n');
    for row in rows {
        contents.push_str(&row.to_string());
        contents.push('\n');
    }
    std::fs::write(path, contents).with_context(|| format!("cannot write {}", path.display()))?;
    log::debug!("wrote {} records to {}", rows.len(), path.display());
    Ok(())
}

/// Read back a scheduler configuration saved with [`write_csv`], falling
/// back to the default configuration when the file does not exist.
pub fn load_best_config(
    path: &std::path::Path,
) -> anyhow::Result<crate::scheduler::SchedulerConfig> {
    if !path.exists() {
        log::debug!(
            "{} does not exist, using the default configuration",
            path.display()
        );
        return Ok(crate::scheduler::SchedulerConfig::default());
    }
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    let row = contents
        .lines()
        .nth(1)
        .with_context(|| format!("{} holds no data row", path.display()))?;
    crate::scheduler::SchedulerConfig::from_csv_row(row)
}
