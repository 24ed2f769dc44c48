use crate::access::{Action, Role};
use crate::cert::{
    today, Certificate, CertificateColumn, CertificateFields, DeliveryInfo, DeliveryTarget,
};
use crate::cli::args::*;
use crate::cli::completions::{handle_completion_command, handle_completion_helper_command};
use crate::csv;
use crate::filter::{PageSize, SearchField, SelectionState, StatusFilter, ViewState};
use crate::receipt::{PrintMode, ReceiptRenderer};
use crate::registry::CertificateRegistry;
use crate::utils::config::Config;
use crate::utils::errors::{RegistryError, Result};
use crate::utils::output::OutputFormat;
use crate::utils::paths::RegistryPaths;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

pub async fn handle_command(cli: Cli) -> Result<()> {
    // Initialize logging - always to stderr
    if !cli.quiet {
        let log_level = match cli.verbose {
            0 => "cert_registry=warn",
            1 => "cert_registry=info",
            2 => "cert_registry=debug",
            _ => "cert_registry=trace",
        };

        tracing_subscriber::fmt()
            .with_writer(io::stderr)
            .with_env_filter(log_level)
            .init();
    }

    let output = OutputFormat::new(cli.raw);

    // Commands that never touch the backend
    match &cli.command {
        Commands::Completion { command } => return handle_completion_command(command),
        Commands::Template { output: dir } => return handle_template(dir.as_deref(), cli.quiet),
        _ => {}
    }

    RegistryPaths::ensure_all_dirs()?;
    let config = load_config(&cli)?;
    let context = Context::open(config, cli.quiet).await?;

    match cli.command {
        Commands::List {
            search,
            field,
            status,
            page,
            page_size,
            columns,
        } => {
            let query = ListQuery {
                search,
                field,
                status,
                page,
                page_size: page_size.unwrap_or(context.page_size),
                columns,
            };
            handle_list(&context, query, &output)
        }
        Commands::Stats => {
            let stats = context.registry.stats();
            output.print_key_value(&[
                ("Total", stats.total),
                ("Delivered", stats.delivered),
                ("Pending", stats.pending),
            ]);
            Ok(())
        }
        Commands::Add { fields } => handle_add(&context, fields).await,
        Commands::Edit { id, fields } => handle_edit(&context, &id, fields).await,
        Commands::Delete { id, yes } => handle_delete(&context, &id, yes).await,
        Commands::Deliver {
            ids,
            all_pending,
            receiver,
        } => handle_deliver(&context, ids, all_pending, receiver).await,
        Commands::UndoDelivery { id, yes } => handle_undo_delivery(&context, &id, yes).await,
        Commands::Import { file } => handle_import(&context, &file).await,
        Commands::Export { ids, output: dir } => handle_export(&context, &ids, dir.as_deref()),
        Commands::Print { ids, mode } => handle_print(&context, &ids, mode),
        Commands::CompletionHelper { command } => {
            handle_completion_helper_command(&command, &context.registry, &output)
        }
        Commands::Completion { .. } | Commands::Template { .. } => Ok(()),
    }
}

/// Config file, then environment, then command-line flags
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load_or_default(cli.config.as_deref())?;
    config.apply_env();
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(role) = cli.role {
        config.role = role;
    }
    Ok(config)
}

/// Everything a backend-bound command needs
struct Context {
    registry: CertificateRegistry,
    role: Role,
    page_size: PageSize,
    organization: Option<String>,
    quiet: bool,
}

impl Context {
    async fn open(config: Config, quiet: bool) -> Result<Self> {
        let registry = CertificateRegistry::new(config.create_backend()?);
        let count = registry.load().await?;
        tracing::info!(
            "Loaded {} certificate(s) from {} backend",
            count,
            registry.backend_name()
        );

        Ok(Self {
            registry,
            role: config.role,
            page_size: config.page_size()?,
            organization: config.organization,
            quiet,
        })
    }

    fn require(&self, action: Action) -> Result<()> {
        self.role.require(action)
    }

    fn certificate(&self, id: &str) -> Result<Certificate> {
        self.registry
            .get(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// Print selection built from ids, in the order given
    fn print_selection(&self, ids: &[String]) -> Result<SelectionState> {
        let mut selection = SelectionState::new();
        for id in ids {
            let cert = self.certificate(id)?;
            if !selection.is_selected_for_print(&cert.id) {
                selection.toggle_print(&cert);
            }
        }
        Ok(selection)
    }

    fn report(&self, message: impl AsRef<str>) {
        if !self.quiet {
            println!("{}", message.as_ref());
        }
    }
}

struct ListQuery {
    search: Option<String>,
    field: SearchField,
    status: StatusFilter,
    page: usize,
    page_size: PageSize,
    columns: Option<String>,
}

fn handle_list(context: &Context, query: ListQuery, output: &OutputFormat) -> Result<()> {
    let columns = CertificateColumn::parse_list(query.columns.as_deref())
        .map_err(RegistryError::Validation)?;

    let mut view = ViewState::new(query.page_size);
    if let Some(term) = query.search {
        view.set_search_term(term);
    }
    view.set_search_field(query.field);
    view.set_status_filter(query.status);
    view.set_page(query.page);

    let certificates = context.registry.certificates();
    let page = view.page(&certificates);
    if page.items.is_empty() {
        // Nothing found - output nothing for UNIX compatibility
        return Ok(());
    }

    output.print_records(&page.items, &columns);
    if !output.raw && !context.quiet {
        println!();
        println!(
            "Showing {}-{} of {} (page {} of {})",
            page.first_row(),
            page.last_row(),
            page.filtered_count,
            page.number,
            page.total_pages
        );
    }
    Ok(())
}

async fn handle_add(context: &Context, args: FieldArgs) -> Result<()> {
    context.require(Action::Add)?;

    let fields = CertificateFields::new(args.no, args.description)
        .with_part_no(args.part_no)
        .with_serial_no(args.serial_no)
        .with_status(args.status);
    let id = context.registry.create(fields).await?;
    context.report(format!("Certificate added: {id}"));
    Ok(())
}

async fn handle_edit(context: &Context, id: &str, args: EditArgs) -> Result<()> {
    context.require(Action::Edit)?;

    let mut fields = context.certificate(id)?.fields();
    if let Some(no) = args.no {
        fields.no = no;
    }
    if let Some(description) = args.description {
        fields.description = description;
    }
    if let Some(part_no) = args.part_no {
        fields.part_no = part_no;
    }
    if let Some(serial_no) = args.serial_no {
        fields.serial_no = serial_no;
    }
    if let Some(status) = args.status {
        fields.status = status;
    }

    context.registry.update(id, fields).await?;
    context.report(format!("Certificate updated: {id}"));
    Ok(())
}

async fn handle_delete(context: &Context, id: &str, yes: bool) -> Result<()> {
    context.require(Action::Delete)?;

    let cert = context.certificate(id)?;
    let confirmed = yes || confirm(&format!("Delete certificate {cert}?"))?;

    let mut selection = SelectionState::new();
    if context
        .registry
        .delete(id, confirmed.into(), &mut selection)
        .await?
    {
        context.report(format!("Certificate deleted: {id}"));
    } else {
        context.report("Delete cancelled");
    }
    Ok(())
}

async fn handle_deliver(
    context: &Context,
    ids: Vec<String>,
    all_pending: bool,
    receiver: ReceiverArgs,
) -> Result<()> {
    context.require(Action::Deliver)?;

    let mut info = DeliveryInfo::new(receiver.receiver_name)
        .with_position(receiver.position)
        .with_signature(receiver.signature)
        .with_notes(receiver.notes);
    if let Some(date) = receiver.date {
        info = info.with_date(date);
    }

    let report = if all_pending {
        let certificates = context.registry.certificates();
        let mut view = ViewState::new(PageSize::All);
        view.set_status_filter(StatusFilter::Pending);

        let mut selection = SelectionState::new();
        selection.toggle_all_delivery(&view.filtered(&certificates));
        context
            .registry
            .deliver_selection(info, &mut selection)
            .await?
    } else if ids.is_empty() {
        return Err(RegistryError::validation(
            "Please select undelivered certificates",
        ));
    } else {
        context
            .registry
            .deliver(DeliveryTarget::from_ids(ids), info)
            .await?
    };

    context.report(format!(
        "Successfully delivered {} certificate(s)",
        report.affected()
    ));
    for id in &report.skipped {
        context.report(format!("Skipped {id}: already delivered or missing"));
    }
    Ok(())
}

async fn handle_undo_delivery(context: &Context, id: &str, yes: bool) -> Result<()> {
    context.require(Action::Deliver)?;

    let cert = context.certificate(id)?;
    if !cert.delivered {
        return Err(RegistryError::validation(format!(
            "Certificate {} is not delivered",
            cert.no
        )));
    }

    let receiver = cert.receiver_name().unwrap_or_default();
    if !yes && !confirm(&format!("Undo delivery of {} to {}?", cert.no, receiver))? {
        context.report("Undo cancelled");
        return Ok(());
    }

    context.registry.undo_delivery(id).await?;
    context.report(format!("Delivery undone: {id}"));
    Ok(())
}

async fn handle_import(context: &Context, file: &Path) -> Result<()> {
    context.require(Action::Import)?;

    let text = fs::read_to_string(file)?;
    let count = context.registry.import_csv(&text).await?;
    context.report(format!("Successfully imported {count} certificate(s)"));
    Ok(())
}

fn handle_export(context: &Context, ids: &[String], dir: Option<&Path>) -> Result<()> {
    context.require(Action::Export)?;

    let selection = context.print_selection(ids)?;
    let (text, count) = context.registry.export_csv(&selection)?;

    match dir {
        Some(dir) => {
            let path = write_into(dir, &csv::export_filename(today()), &text)?;
            context.report(format!(
                "Exported {count} certificate(s) to {}",
                path.display()
            ));
        }
        None => print!("{text}"),
    }
    Ok(())
}

fn handle_template(dir: Option<&Path>, quiet: bool) -> Result<()> {
    let text = csv::template();
    match dir {
        Some(dir) => {
            let path = write_into(dir, csv::TEMPLATE_FILENAME, &text)?;
            if !quiet {
                println!("Template written to {}", path.display());
            }
        }
        None => print!("{text}"),
    }
    Ok(())
}

fn handle_print(context: &Context, ids: &[String], mode: PrintMode) -> Result<()> {
    let selection = context.print_selection(ids)?;
    let certificates = context.registry.certificates();
    let selected = selection.selected_for_print(&certificates);

    if mode == PrintMode::Single && selected.len() > 1 {
        tracing::warn!(
            "Single mode prints one receipt, ignoring {} other certificate(s)",
            selected.len() - 1
        );
    }

    let renderer = match &context.organization {
        Some(organization) => ReceiptRenderer::new(organization.clone()),
        None => ReceiptRenderer::default(),
    };
    print!("{}", renderer.render(mode, &selected)?);
    Ok(())
}

fn write_into(dir: &Path, filename: &str, contents: &str) -> Result<PathBuf> {
    RegistryPaths::ensure_dir_exists(dir)?;
    let path = dir.join(filename);
    fs::write(&path, contents)?;
    tracing::debug!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(path)
}

/// y/N prompt on stderr; anything but y/yes declines
fn confirm(question: &str) -> Result<bool> {
    eprint!("{question} [y/N] ");
    io::stderr().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("no"));
    }

    #[test]
    fn test_write_into_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out");
        let path = write_into(&target, csv::TEMPLATE_FILENAME, "a,b\n").unwrap();
        assert_eq!(path, target.join(csv::TEMPLATE_FILENAME));
        assert_eq!(fs::read_to_string(path).unwrap(), "a,b\n");
    }

    #[tokio::test]
    async fn test_viewer_cannot_add() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.local.path = Some(dir.path().join("certs.json"));
        config.role = Role::Viewer;

        let context = Context::open(config, true).await.unwrap();
        let args = FieldArgs {
            no: "CERT-001".to_string(),
            description: "Engine Part".to_string(),
            part_no: String::new(),
            serial_no: String::new(),
            status: String::new(),
        };
        assert!(matches!(
            handle_add(&context, args).await,
            Err(RegistryError::PermissionDenied(_))
        ));
        assert_eq!(context.registry.stats().total, 0);
    }

    #[tokio::test]
    async fn test_edit_keeps_unspecified_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.local.path = Some(dir.path().join("certs.json"));

        let context = Context::open(config, true).await.unwrap();
        let id = context
            .registry
            .create(CertificateFields::new("CERT-001", "Engine Part").with_part_no("P-1"))
            .await
            .unwrap();

        let args = EditArgs {
            no: None,
            description: None,
            part_no: None,
            serial_no: Some("SN-9".to_string()),
            status: None,
        };
        handle_edit(&context, &id, args).await.unwrap();

        let cert = context.registry.get(&id).unwrap();
        assert_eq!(cert.part_no, "P-1");
        assert_eq!(cert.serial_no, "SN-9");
        assert_eq!(cert.no, "CERT-001");
    }

    #[tokio::test]
    async fn test_export_unknown_id_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.local.path = Some(dir.path().join("certs.json"));

        let context = Context::open(config, true).await.unwrap();
        assert!(matches!(
            handle_export(&context, &["missing".to_string()], None),
            Err(RegistryError::NotFound(_))
        ));
    }
}
