//! CLI module for the pilltrack application
//!
//! Renders the single tracking screen and turns subcommands or shell lines into
//! tracker operations. Every store write is awaited before the next command runs.
use std::{
    io::{stdin, stdout, BufRead, Write},
    path::Path,
    sync::Arc,
};

use console::style;
use log::{debug, info};

use crate::{
    today_marker, Cli, Commands, Config, DoseSummary, FileStore, FormMode, KeyValueStore,
    MedicationRecord, PillError, Result, Tracker,
};

/// Resolves configuration, loads the tracker and runs the requested command
pub async fn execute(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let command = match cli.command {
        Commands::Config { show, set, reset } => {
            // A broken file must not block the reset that repairs it.
            let config = if reset {
                Config::default()
            } else {
                Config::load(&config_path)?
            };
            return handle_config(&config_path, config, show, set, reset);
        }
        other => other,
    };

    let mut config = Config::load(&config_path)?;

    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    info!("Using data directory {}", config.data_dir.display());
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&config.data_dir)?);
    let today = today_marker(&config.date_format)?;
    let tracker = Tracker::load(store, &today).await?;

    App::new(tracker).run(command).await
}

fn handle_config(
    path: &Path,
    mut config: Config,
    show: bool,
    set: Option<String>,
    reset: bool,
) -> Result<()> {
    if reset {
        Config::default().save(path)?;
        println!("Configuration reset to defaults");
        return Ok(());
    }

    if let Some(setting) = &set {
        config.apply_setting(setting)?;
        config.save(path)?;
        println!("Updated {}", setting);
    }

    if show || set.is_none() {
        println!("Config file: {}", path.display());
        println!("{}", serde_json::to_string_pretty(&config)?);
    }

    Ok(())
}

/// CLI Application handler - processes commands against the loaded tracker
pub struct App {
    tracker: Tracker,
}

impl App {
    pub fn new(tracker: Tracker) -> Self {
        Self { tracker }
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    /// Run the CLI application with the given command
    pub async fn run(&mut self, command: Commands) -> Result<()> {
        let mut out = stdout();

        match command {
            Commands::List { json } => {
                if json {
                    write_json(&self.tracker, &mut out)?
                } else {
                    write_screen(&self.tracker, &mut out)?
                }
            }

            Commands::Add {
                name,
                quantity,
                time,
            } => self.handle_add(name, quantity, time, &mut out).await?,

            Commands::Edit {
                id,
                name,
                quantity,
                time,
            } => self.handle_edit(id, name, quantity, time, &mut out).await?,

            Commands::Take { id } => self.handle_take(id, &mut out).await?,

            Commands::Delete { id, force } => self.handle_delete(id, force).await?,

            Commands::Summary => write_summary(self.tracker.summary(), &mut out)?,

            Commands::Shell => {
                let input = stdin();
                self.run_shell(input.lock(), &mut out).await?
            }

            Commands::Config { .. } => {
                return Err(PillError::ConfigError {
                    message: "config commands run before the tracker is loaded".to_string(),
                })
            }
        }

        Ok(())
    }

    async fn handle_add<W: Write>(
        &mut self,
        name: String,
        quantity: String,
        time: String,
        out: &mut W,
    ) -> Result<()> {
        self.tracker.set_name(name);
        self.tracker.set_quantity(quantity);
        self.tracker.set_scheduled_time(time);
        self.tracker.submit()?.wait().await?;

        if let Some(record) = self.tracker.records().last() {
            writeln!(out, "Medication added with ID: {}", record.id)?;
        }
        Ok(())
    }

    async fn handle_edit<W: Write>(
        &mut self,
        id: String,
        name: Option<String>,
        quantity: Option<String>,
        time: Option<String>,
        out: &mut W,
    ) -> Result<()> {
        self.tracker.prepare_edit(&id)?;

        if let Some(name) = name {
            self.tracker.set_name(name);
        }
        if let Some(quantity) = quantity {
            self.tracker.set_quantity(quantity);
        }
        if let Some(time) = time {
            self.tracker.set_scheduled_time(time);
        }

        self.tracker.submit()?.wait().await?;
        writeln!(out, "Medication {} updated successfully", id)?;
        Ok(())
    }

    async fn handle_take<W: Write>(&mut self, id: String, out: &mut W) -> Result<()> {
        if self.tracker.state().find(&id).is_none() {
            return Err(PillError::RecordNotFound { id });
        }

        self.tracker.toggle_taken(&id)?.wait().await?;

        if let Some(record) = self.tracker.state().find(&id) {
            writeln!(out, "{} is now {}", record.name, status(record))?;
        }
        Ok(())
    }

    async fn handle_delete(&mut self, id: String, force: bool) -> Result<()> {
        let record = match self.tracker.state().find(&id) {
            Some(record) => record.clone(),
            None => return Err(PillError::RecordNotFound { id }),
        };

        if !force {
            let input = stdin();
            if !confirm_delete(&record, &mut input.lock(), &mut stdout())? {
                println!("Deletion cancelled.");
                return Ok(());
            }
        }

        self.tracker.delete(&id)?.wait().await?;
        println!("Medication '{}' ({}) has been deleted.", record.name, record.id);
        Ok(())
    }

    /// Interactive loop over one screen. Ends on `quit` or end of input.
    pub async fn run_shell<R: BufRead, W: Write>(&mut self, mut input: R, out: &mut W) -> Result<()> {
        writeln!(out, "pilltrack shell. Type `help` for commands.")?;
        write_screen(&self.tracker, out)?;

        loop {
            write!(out, "> ")?;
            out.flush()?;

            let Some(line) = read_line(&mut input)? else {
                break;
            };

            let mut parts = line.split_whitespace();
            let command = parts.next().unwrap_or("");
            let argument = parts.next();
            debug!("Shell command: {:?} {:?}", command, argument);

            match (command, argument) {
                ("", _) => continue,
                ("quit" | "exit", _) => break,
                ("help", _) => write_help(out)?,
                ("ls" | "list", _) => write_screen(&self.tracker, out)?,
                ("add", _) => {
                    if !self.shell_submit(&mut input, out).await? {
                        break;
                    }
                }
                ("edit", Some(id)) => match self.tracker.prepare_edit(id) {
                    Ok(()) => {
                        if !self.shell_submit(&mut input, out).await? {
                            break;
                        }
                    }
                    Err(e @ PillError::RecordNotFound { .. }) => writeln!(out, "{}", e)?,
                    Err(e) => return Err(e),
                },
                ("take", Some(id)) => {
                    self.tracker.toggle_taken(id)?.wait().await?;
                    write_screen(&self.tracker, out)?;
                }
                ("rm" | "delete", Some(id)) => {
                    self.tracker.delete(id)?.wait().await?;
                    write_screen(&self.tracker, out)?;
                }
                ("edit" | "take" | "rm" | "delete", None) => {
                    writeln!(out, "Usage: {} <id>", command)?
                }
                _ => writeln!(out, "Unknown command: {}. Type `help`.", line.trim())?,
            }
        }

        writeln!(out, "Bye")?;
        Ok(())
    }

    /// Prompts for the three form fields and submits. Returns false on end of input.
    ///
    /// An empty answer keeps what the form already holds, so after `edit` or a
    /// rejected submit the user only retypes what needs changing.
    async fn shell_submit<R: BufRead, W: Write>(&mut self, input: &mut R, out: &mut W) -> Result<bool> {
        if let FormMode::Editing(id) = self.tracker.form().mode() {
            writeln!(out, "Editing {}", id)?;
        }

        let form = self.tracker.form().clone();
        let Some(name) = prompt(input, out, "Name", &form.name)? else {
            return Ok(false);
        };
        let Some(quantity) = prompt(input, out, "Quantity", &form.quantity)? else {
            return Ok(false);
        };
        let Some(time) = prompt(input, out, "Time", &form.scheduled_time)? else {
            return Ok(false);
        };

        self.tracker.set_name(name);
        self.tracker.set_quantity(quantity);
        self.tracker.set_scheduled_time(time);

        match self.tracker.submit() {
            Ok(pending) => {
                pending.wait().await?;
                writeln!(out, "{}", style("Saved").green())?;
                write_screen(&self.tracker, out)?;
            }
            Err(e) if e.is_validation() => writeln!(out, "{}", style(e).red())?,
            Err(e) => return Err(e),
        }

        Ok(true)
    }
}

fn read_line<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

fn prompt<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    label: &str,
    current: &str,
) -> Result<Option<String>> {
    if current.is_empty() {
        write!(out, "{}: ", label)?;
    } else {
        write!(out, "{} [{}]: ", label, current)?;
    }
    out.flush()?;

    let Some(line) = read_line(input)? else {
        return Ok(None);
    };

    let answer = line.trim_end_matches(|c| c == '\r' || c == '\n');
    if answer.is_empty() {
        Ok(Some(current.to_string()))
    } else {
        Ok(Some(answer.to_string()))
    }
}

fn confirm_delete<R: BufRead, W: Write>(
    record: &MedicationRecord,
    input: &mut R,
    out: &mut W,
) -> Result<bool> {
    writeln!(out, "You are about to delete the following medication:")?;
    writeln!(out, "ID:       {}", record.id)?;
    writeln!(out, "Name:     {}", record.name)?;
    writeln!(out, "Quantity: {}", record.quantity)?;
    writeln!(out, "Time:     {}", record.scheduled_time)?;
    write!(out, "\nAre you sure you want to delete it? [y/N]: ")?;
    out.flush()?;

    let answer = read_line(input)?.unwrap_or_default().trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}

fn status(record: &MedicationRecord) -> console::StyledObject<&'static str> {
    if record.taken_today {
        style(record.status_label()).green()
    } else {
        style(record.status_label()).red()
    }
}

fn write_summary<W: Write>(summary: DoseSummary, out: &mut W) -> Result<()> {
    writeln!(
        out,
        "Total: {} | Taken: {} | Pending: {}",
        summary.total, summary.taken, summary.pending
    )?;
    Ok(())
}

/// Header line plus every record in display order
fn write_screen<W: Write>(tracker: &Tracker, out: &mut W) -> Result<()> {
    writeln!(out, "{}", style("Medication log").bold())?;
    write_summary(tracker.summary(), out)?;

    let records = tracker.sorted();
    if records.is_empty() {
        writeln!(out, "No medications yet.")?;
        return Ok(());
    }

    let term_width = terminal_size::terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(80);

    for (i, record) in records.iter().enumerate() {
        if i > 0 {
            writeln!(out, "{}", "-".repeat(term_width.min(50)))?;
        }

        writeln!(
            out,
            "{} | {} | {}",
            style(&record.name).bold(),
            record.quantity,
            style(&record.scheduled_time).cyan()
        )?;
        writeln!(out, "{}  (ID: {})", status(record), record.id)?;
    }

    Ok(())
}

fn write_json<W: Write>(tracker: &Tracker, out: &mut W) -> Result<()> {
    let screen = serde_json::json!({
        "summary": tracker.summary(),
        "records": tracker.sorted(),
    });
    writeln!(out, "{}", serde_json::to_string_pretty(&screen)?)?;
    Ok(())
}

fn write_help<W: Write>(out: &mut W) -> Result<()> {
    writeln!(out, "Commands:")?;
    writeln!(out, "  ls           show the list")?;
    writeln!(out, "  add          fill in the form and save it")?;
    writeln!(out, "  edit <id>    load a medication into the form and save it")?;
    writeln!(out, "  take <id>    toggle taken/pending")?;
    writeln!(out, "  rm <id>      delete a medication")?;
    writeln!(out, "  quit         leave the shell")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use clap::Parser;

    use super::*;
    use crate::{MemoryStore, RECORDS_KEY, RESET_MARKER_KEY};

    const TODAY: &str = "5/6/2025";

    async fn app_with(records: &[MedicationRecord]) -> (App, Arc<dyn KeyValueStore>) {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        store
            .set_item(RECORDS_KEY, &serde_json::to_string(records).unwrap())
            .unwrap();
        store.set_item(RESET_MARKER_KEY, TODAY).unwrap();

        let tracker = Tracker::load(Arc::clone(&store), TODAY).await.unwrap();
        (App::new(tracker), store)
    }

    async fn shell(app: &mut App, script: &str) -> String {
        let mut out = Vec::new();
        app.run_shell(Cursor::new(script.as_bytes()), &mut out)
            .await
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    fn aspirin() -> MedicationRecord {
        MedicationRecord::new("1".into(), "Aspirin".into(), 2, "08:00".into())
    }

    #[tokio::test]
    async fn shell_adds_a_record() {
        let (mut app, store) = app_with(&[]).await;

        let output = shell(&mut app, "add\nIbuprofen\n1\n12:00\nquit\n").await;

        assert!(output.contains("Ibuprofen"));
        assert!(output.contains("Total: 1 | Taken: 0 | Pending: 1"));
        let records = app.tracker().records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].quantity, 1);

        let persisted: Vec<MedicationRecord> =
            serde_json::from_str(&store.get_item(RECORDS_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(persisted, records);
    }

    #[tokio::test]
    async fn shell_reports_validation_and_keeps_input() {
        let (mut app, _) = app_with(&[]).await;

        let output = shell(&mut app, "add\nAspirin\n-1\n08:00\n").await;

        assert!(output.contains("Quantity must be a valid number"));
        assert!(app.tracker().records().is_empty());
        assert_eq!(app.tracker().form().name, "Aspirin");
        assert_eq!(app.tracker().form().quantity, "-1");
    }

    #[tokio::test]
    async fn shell_retry_reuses_previous_answers() {
        let (mut app, _) = app_with(&[]).await;

        shell(&mut app, "add\nAspirin\n-1\n08:00\nadd\n\n2\n\nquit\n").await;

        let records = app.tracker().records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Aspirin");
        assert_eq!(records[0].quantity, 2);
        assert_eq!(records[0].scheduled_time, "08:00");
    }

    #[tokio::test]
    async fn shell_edit_keeps_blank_answers() {
        let (mut app, _) = app_with(&[aspirin()]).await;

        let output = shell(&mut app, "edit 1\n\n3\n\nquit\n").await;

        assert!(output.contains("Editing 1"));
        assert!(output.contains("Name [Aspirin]: "));
        let record = &app.tracker().records()[0];
        assert_eq!(record.id, "1");
        assert_eq!(record.name, "Aspirin");
        assert_eq!(record.quantity, 3);
        assert_eq!(app.tracker().form().mode(), FormMode::Adding);
    }

    #[tokio::test]
    async fn shell_take_and_remove() {
        let (mut app, _) = app_with(&[
            aspirin(),
            MedicationRecord::new("2".into(), "Zinc".into(), 1, "20:00".into()),
        ])
        .await;

        let output = shell(&mut app, "take 1\nrm 2\nedit 9\ntake\n").await;

        assert!(output.contains("Record not found: 9"));
        assert!(output.contains("Usage: take <id>"));
        let records = app.tracker().records();
        assert_eq!(records.len(), 1);
        assert!(records[0].taken_today);
    }

    #[tokio::test]
    async fn shell_lists_in_time_order() {
        let (mut app, _) = app_with(&[
            MedicationRecord::new("1".into(), "Night".into(), 1, "21:00".into()),
            MedicationRecord::new("2".into(), "Morning".into(), 1, "07:00".into()),
        ])
        .await;

        let output = shell(&mut app, "ls\nquit\n").await;

        let morning = output.find("Morning").unwrap();
        let night = output.find("Night").unwrap();
        assert!(morning < night);
    }

    #[tokio::test]
    async fn one_shot_commands() {
        let (mut app, _) = app_with(&[aspirin()]).await;
        let mut out = Vec::new();

        app.handle_edit("1".into(), None, Some("4".into()), None, &mut out)
            .await
            .unwrap();
        app.handle_take("1".into(), &mut out).await.unwrap();
        app.handle_add("Zinc".into(), "1".into(), "20:00".into(), &mut out)
            .await
            .unwrap();
        app.handle_delete("1".into(), true).await.unwrap();

        let records = app.tracker().records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Zinc");

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Medication 1 updated successfully"));
        assert!(text.contains("Aspirin is now"));
        assert!(text.contains("Medication added with ID:"));
    }

    #[tokio::test]
    async fn one_shot_unknown_id_is_reported() {
        let (mut app, _) = app_with(&[]).await;
        let mut out = Vec::new();

        assert!(matches!(
            app.handle_take("x".into(), &mut out).await,
            Err(PillError::RecordNotFound { .. })
        ));
        assert!(matches!(
            app.handle_edit("x".into(), None, None, None, &mut out).await,
            Err(PillError::RecordNotFound { .. })
        ));
    }

    #[test]
    fn delete_needs_explicit_yes() {
        let record = aspirin();
        let mut out = Vec::new();

        assert!(confirm_delete(&record, &mut Cursor::new("y\n"), &mut out).unwrap());
        assert!(confirm_delete(&record, &mut Cursor::new("YES\n"), &mut out).unwrap());
        assert!(!confirm_delete(&record, &mut Cursor::new("\n"), &mut out).unwrap());
        assert!(!confirm_delete(&record, &mut Cursor::new(""), &mut out).unwrap());
    }

    #[tokio::test]
    async fn config_reset_repairs_unreadable_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, r#"{"date_format":"%"}"#).unwrap();
        let path_arg = path.to_string_lossy().to_string();

        let broken = Cli::try_parse_from(["pilltrack", "-c", &path_arg, "config", "--show"]).unwrap();
        assert!(matches!(
            execute(broken).await,
            Err(PillError::ConfigError { .. })
        ));

        let reset = Cli::try_parse_from(["pilltrack", "-c", &path_arg, "config", "--reset"]).unwrap();
        execute(reset).await.unwrap();

        assert_eq!(Config::load(&path).unwrap(), Config::default());
    }

    #[tokio::test]
    async fn json_output_has_summary_and_sorted_records() {
        let (app, _) = app_with(&[
            MedicationRecord::new("1".into(), "B".into(), 1, "09:00".into()),
            MedicationRecord::new("2".into(), "A".into(), 1, "08:00".into()),
        ])
        .await;
        let mut out = Vec::new();

        write_json(app.tracker(), &mut out).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["summary"]["total"], 2);
        assert_eq!(value["records"][0]["nombre"], "A");
        assert_eq!(value["records"][1]["tiempo"], "09:00");
    }
}
