// src/commands/mod.rs
//! Command-line workflows.
//!
//! Each command builds an [`App`], restores the session from durable storage
//! and then runs against the certificate API. A credential the server no
//! longer accepts is dropped on the spot.

use anyhow::{anyhow, bail, Context, Result};
use certificate_registry::client::{ApiClient, CertificateRepository};
use certificate_registry::config::Settings;
use certificate_registry::error::ClientError;
use certificate_registry::models::certificate::{Certificate, CertificateSummary, NewCertificate};
use certificate_registry::models::verification::VerificationOutcome;
use certificate_registry::services::api_server::ApiServer;
use certificate_registry::services::dashboard::{DashboardSummary, DEFAULT_RECENT};
use certificate_registry::services::verifier::Verifier;
use certificate_registry::session::{FileTokenStore, Session, SessionState};
use certificate_registry::utils::crypto::CertificateSigner;
use clap::{Args, Parser, Subcommand};
use log::debug;
use std::io::{self, BufRead, Write};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "certificate-registry")]
#[command(about = "Issue and verify university degree certificates", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the reference certificate API server
    Serve {
        /// Overrides the configured bind address
        #[arg(long)]
        bind: Option<SocketAddr>,
    },

    /// Print a fresh certificate signing key for CERTS_SERVER__SIGNING_KEY
    Keygen,

    /// Sign in as an admin
    Login(LoginArgs),

    /// Sign out and forget the stored credential
    Logout,

    /// Show the signed-in admin
    Whoami,

    /// Totals and the most recent certificates
    Dashboard {
        #[arg(long, default_value_t = DEFAULT_RECENT)]
        recent: usize,
    },

    /// List all certificates
    List,

    /// Show one certificate in full
    Show { uuid: String },

    /// Issue a new certificate
    Issue(IssueArgs),

    /// Revoke a certificate permanently
    Revoke {
        uuid: String,
        #[arg(long)]
        reason: String,
    },

    /// Save the printable certificate document
    Download {
        uuid: String,
        /// Destination file; defaults to certificate_<uuid>.pdf
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Publicly verify a certificate
    Verify { uuid: String },
}

#[derive(Debug, Args)]
pub struct LoginArgs {
    #[arg(short, long)]
    pub username: String,
    /// Read from stdin when omitted
    #[arg(short, long)]
    pub password: Option<String>,
}

#[derive(Debug, Args)]
pub struct IssueArgs {
    #[arg(long)]
    pub first_name: String,
    #[arg(long)]
    pub last_name: String,
    #[arg(long)]
    pub student_id: String,
    #[arg(long)]
    pub email: Option<String>,
    /// One of the accepted degree titles, e.g. "Bachelor of Science"
    #[arg(long)]
    pub degree: String,
    #[arg(long)]
    pub program: String,
    /// YYYY-MM-DD
    #[arg(long)]
    pub issue_date: String,
}

impl From<IssueArgs> for NewCertificate {
    fn from(args: IssueArgs) -> Self {
        NewCertificate {
            first_name: args.first_name,
            last_name: args.last_name,
            student_id: args.student_id,
            email: args.email,
            degree: args.degree,
            program: args.program,
            issue_date: args.issue_date,
        }
    }
}

/// Application context shared by the client-side commands.
pub struct App {
    session: Session,
    repository: CertificateRepository,
}

impl App {
    pub fn new(settings: &Settings) -> Result<Self> {
        let api = ApiClient::from_settings(&settings.client)?;
        let store = FileTokenStore::new(&settings.client.token_path);
        debug!("Using {} with credential file {}", api.base_url(), store.path().display());
        Ok(Self {
            session: Session::new(store),
            repository: CertificateRepository::new(api),
        })
    }

    async fn restore(&mut self) -> &SessionState {
        self.session.restore(self.repository.api()).await
    }

    fn require_login(&self) -> Result<()> {
        if !self.session.is_authenticated() {
            bail!("Not signed in. Run `certificate-registry login` first.");
        }
        Ok(())
    }

    /// Applies the session side effects of a failed call and adds hints.
    fn check<T>(&mut self, result: Result<T, ClientError>) -> Result<T> {
        result.map_err(|err| {
            if self.session.expire_on(&err) {
                return anyhow!("{}. Session expired, please log in again.", err);
            }
            if err.is_not_found() {
                return anyhow!("{}. Run `certificate-registry list` to see issued certificates.", err);
            }
            anyhow::Error::new(err)
        })
    }
}

pub async fn run(cli: Cli, settings: Settings) -> Result<()> {
    match cli.command {
        Commands::Serve { bind } => serve(&settings, bind).await,
        Commands::Verify { uuid } => verify(&settings, &uuid).await,
        Commands::Keygen => {
            println!("{}", keygen());
            Ok(())
        }
        command => {
            let mut app = App::new(&settings)?;
            app.restore().await;
            debug!("Session state: {:?}", app.session.state());
            match command {
                Commands::Login(args) => login(&mut app, args).await,
                Commands::Logout => logout(&mut app),
                Commands::Whoami => whoami(&app),
                Commands::Dashboard { recent } => dashboard(&mut app, recent).await,
                Commands::List => list(&mut app).await,
                Commands::Show { uuid } => show(&mut app, &uuid).await,
                Commands::Issue(args) => issue(&mut app, args.into()).await,
                Commands::Revoke { uuid, reason } => revoke(&mut app, &uuid, &reason).await,
                Commands::Download { uuid, output } => download(&mut app, &uuid, output).await,
                Commands::Serve { .. } | Commands::Verify { .. } | Commands::Keygen => Ok(()),
            }
        }
    }
}

async fn serve(settings: &Settings, bind: Option<SocketAddr>) -> Result<()> {
    let addr = match bind {
        Some(addr) => addr,
        None => settings
            .server
            .bind_addr
            .parse()
            .with_context(|| format!("invalid bind address {:?}", settings.server.bind_addr))?,
    };
    let server = ApiServer::new(&settings.server)?;
    server.run(addr).await?;
    Ok(())
}

/// Base64 secp256k1 secret key, the format the server reads at start-up.
fn keygen() -> String {
    CertificateSigner::generate().to_base64()
}

async fn login(app: &mut App, args: LoginArgs) -> Result<()> {
    let password = match args.password {
        Some(password) => password,
        None => prompt_password()?,
    };
    let result = app.session.login(app.repository.api(), &args.username, &password).await;
    let admin = app.check(result)?;
    println!("Signed in as {}", admin.username);
    Ok(())
}

fn prompt_password() -> Result<String> {
    print!("Password: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn logout(app: &mut App) -> Result<()> {
    app.session.logout()?;
    println!("Signed out");
    Ok(())
}

fn whoami(app: &App) -> Result<()> {
    match app.session.admin() {
        Some(admin) => println!("{} (id {})", admin.username, admin.id),
        None => println!("Not signed in"),
    }
    Ok(())
}

async fn dashboard(app: &mut App, recent: usize) -> Result<()> {
    app.require_login()?;
    let result = app.repository.list(&app.session).await;
    let certificates = app.check(result)?;
    let summary = DashboardSummary::from_certificates(&certificates, recent);

    println!("Total certificates: {}", summary.total);
    println!("Valid:              {}", summary.valid);
    println!("Revoked:            {}", summary.revoked);
    if !summary.recent.is_empty() {
        println!();
        println!("Recent certificates:");
        print_rows(&summary.recent);
    }
    Ok(())
}

async fn list(app: &mut App) -> Result<()> {
    app.require_login()?;
    let result = app.repository.list(&app.session).await;
    let certificates = app.check(result)?;
    if certificates.is_empty() {
        println!("No certificates issued yet");
    } else {
        print_rows(&certificates);
    }
    Ok(())
}

fn print_rows(rows: &[CertificateSummary]) {
    for row in rows {
        let status = if row.revoked { "REVOKED" } else { "VALID" };
        println!(
            "{}  {:<8} {:<24} {:<10} {} in {} ({})",
            row.uuid, status, row.student_name, row.student_id, row.degree, row.program, row.issue_date
        );
    }
}

async fn show(app: &mut App, uuid: &str) -> Result<()> {
    app.require_login()?;
    let result = app.repository.get_by_uuid(&app.session, uuid).await;
    let certificate = app.check(result)?;
    print_certificate(&certificate);
    Ok(())
}

fn print_certificate(certificate: &Certificate) {
    println!("Certificate {}", certificate.uuid);
    println!("  Student:    {} ({})", certificate.student.name, certificate.student.student_id);
    if let Some(email) = &certificate.student.email {
        println!("  Email:      {}", email);
    }
    println!("  Degree:     {}", certificate.degree);
    println!("  Program:    {}", certificate.program);
    println!("  Issued:     {}", certificate.issue_date);
    println!("  Recorded:   {}", certificate.created_at.format("%Y-%m-%d %H:%M:%S"));
    match (&certificate.revoked, &certificate.revoked_reason) {
        (true, Some(reason)) => println!("  Status:     REVOKED ({})", reason),
        (true, None) => println!("  Status:     REVOKED"),
        (false, _) => println!("  Status:     VALID"),
    }
}

async fn issue(app: &mut App, input: NewCertificate) -> Result<()> {
    app.require_login()?;
    let result = app.repository.create(&app.session, &input).await;
    let certificate = app.check(result)?;
    println!("Certificate issued successfully");
    print_certificate(&certificate);
    Ok(())
}

async fn revoke(app: &mut App, uuid: &str, reason: &str) -> Result<()> {
    app.require_login()?;
    let result = app.repository.revoke(&app.session, uuid, reason).await;
    let refreshed = app.check(result)?;
    println!("Certificate revoked successfully");
    match refreshed {
        Some(certificate) => print_certificate(&certificate),
        None => println!("Run `certificate-registry show {}` to see the updated record.", uuid.trim()),
    }
    Ok(())
}

async fn download(app: &mut App, uuid: &str, output: Option<PathBuf>) -> Result<()> {
    let path = output.unwrap_or_else(|| PathBuf::from(format!("certificate_{}.pdf", uuid.trim())));
    let result = app.repository.save_document(&app.session, uuid, &path).await;
    let written = app.check(result)?;
    println!("Saved {} ({} bytes)", path.display(), written);
    Ok(())
}

async fn verify(settings: &Settings, uuid: &str) -> Result<()> {
    let api = ApiClient::from_settings(&settings.client)?;
    let verifier = Verifier::new(CertificateRepository::new(api));
    let outcome = verifier
        .verify_certificate(uuid)
        .await
        .ok_or_else(|| anyhow!("Enter a certificate ID to verify"))?;

    println!("{}: {}", outcome.status(), outcome.message());
    if let VerificationOutcome::Revoked { reason, .. } = &outcome {
        println!("Reason: {}", reason);
    }
    if let Some(certificate) = outcome.certificate() {
        println!("  Student:  {} ({})", certificate.student_name, certificate.student_id);
        println!("  Degree:   {} in {}", certificate.degree, certificate.program);
        println!("  Issued:   {}", certificate.issue_date);
        println!("  Issuer:   {}", certificate.issuer);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keygen_prints_a_loadable_key() {
        let cli = Cli::try_parse_from(["certificate-registry", "keygen"]).unwrap();
        assert!(matches!(cli.command, Commands::Keygen));

        let key = keygen();
        assert!(CertificateSigner::from_base64(&key).is_ok());
        assert_ne!(key, keygen());
    }

    #[test]
    fn test_revoke_requires_reason_flag() {
        assert!(Cli::try_parse_from(["certificate-registry", "revoke", "abc"]).is_err());
        let cli = Cli::try_parse_from(["certificate-registry", "revoke", "abc", "--reason", "Issued in error"])
            .unwrap();
        assert!(matches!(cli.command, Commands::Revoke { ref reason, .. } if reason == "Issued in error"));
    }
}
