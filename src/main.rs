//! Execudoc - 文档朗读客户端
//!
//! 命令行入口：账号登录、上传文档、触发提取/摘要任务、合成并播放语音

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

use execudoc::application::ports::{
    AccountPort, AccountSession, AudioAssetPort, DocumentRepositoryPort, FileStoragePort,
    PlaybackEnginePort, RemoteJobPort, SessionStorePort, UploadFile,
};
use execudoc::application::{
    ApplicationError, AudioController, DeleteDocument, DeleteDocumentHandler, ExtractDocumentText,
    ExtractTextHandler, GetCurrentUser, GetCurrentUserHandler, GetFileUrls, GetFileUrlsHandler,
    IssueJwt, IssueJwtHandler, ListUserDocuments, ListUserDocumentsHandler, Login, LoginHandler,
    Logout, LogoutHandler, PlayOutcome, PlayerConfig, PlayerEvent, Register, RegisterHandler,
    ResolveListenText, ResolveListenTextHandler, SummarizeDocument, SummarizeHandler, TextSource,
    UploadDocument, UploadDocumentHandler,
};
use execudoc::config::{load_config_from_path, print_config, AppConfig, EngineKind};
use execudoc::domain::audio::PlaybackStatus;
use execudoc::domain::document::DocumentId;
use execudoc::infrastructure::adapters::{
    AppwriteAccount, AppwriteAudioAssets, AppwriteClient, AppwriteDocumentRepository,
    AppwriteFileStorage, FileSessionStore, HttpJobClient, HttpTtsClient, HttpTtsClientConfig,
    SimulatedPlaybackEngine,
};

#[derive(Parser, Debug)]
#[command(name = "execudoc", about = "Upload documents, summarise them and listen to the result")]
struct Args {
    /// Path to config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an account and log in
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "")]
        name: String,
    },
    /// Log in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Delete the saved session
    Logout,
    /// Show the logged-in user
    Whoami {
        /// Also issue a short-lived JWT for the session
        #[arg(long)]
        jwt: bool,
    },
    /// Upload a file and create its document record
    Upload {
        path: PathBuf,
        /// Owner (defaults to the logged-in user)
        #[arg(short, long)]
        user: Option<String>,
        /// MIME type (guessed from the extension when omitted)
        #[arg(long)]
        mime: Option<String>,
    },
    /// List a user's documents, newest first
    List {
        /// Owner (defaults to the logged-in user)
        #[arg(short, long)]
        user: Option<String>,
    },
    /// Run the text extraction job
    Extract { document_id: String },
    /// Run the summarise job
    Summarize { document_id: String },
    /// Synthesize and play a document's summary or full text
    Listen {
        document_id: String,
        #[arg(long, value_enum, default_value_t = SourceArg::Summary)]
        source: SourceArg,
    },
    /// Delete a document, its stored file and its cached audio
    Delete { document_id: String },
    /// Print view and download URLs of the stored file
    Url { document_id: String },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SourceArg {
    Summary,
    FullText,
}

impl From<SourceArg> for TextSource {
    fn from(source: SourceArg) -> Self {
        match source {
            SourceArg::Summary => TextSource::Summary,
            SourceArg::FullText => TextSource::FullText,
        }
    }
}

/// 后端适配器集合
struct Services {
    config: AppConfig,
    session: Option<AccountSession>,
    account: Arc<dyn AccountPort>,
    sessions: Arc<dyn SessionStorePort>,
    documents: Arc<dyn DocumentRepositoryPort>,
    files: Arc<dyn FileStoragePort>,
    assets: Arc<dyn AudioAssetPort>,
    jobs: Arc<dyn RemoteJobPort>,
}

impl Services {
    async fn build(config: AppConfig) -> anyhow::Result<Self> {
        let client = AppwriteClient::new(&config.backend)
            .map_err(|e| anyhow::anyhow!("Failed to create backend client: {:?}", e))?;

        let sessions = Arc::new(FileSessionStore::new(&config.auth.session_file));
        let session = match sessions.load().await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, path = %config.auth.session_file, "Ignoring unreadable session file");
                None
            }
        };
        let account = Arc::new(AppwriteAccount::new(client.clone()));

        // 已登录时以会话身份访问数据库与存储
        let client = match &session {
            Some(session) => {
                tracing::debug!(user_id = %session.user_id, "Using saved session");
                client.with_session(&session.secret)
            }
            None => client,
        };

        let documents = Arc::new(AppwriteDocumentRepository::new(
            client.clone(),
            &config.backend.database_id,
            &config.backend.documents_collection_id,
        ));
        let files = Arc::new(AppwriteFileStorage::new(client.clone(), &config.backend.bucket_id));
        let assets = Arc::new(AppwriteAudioAssets::new(client.clone(), &config.tts.bucket_id));
        let jobs = Arc::new(HttpJobClient::new(
            client,
            &config.functions.summarise_url,
            &config.functions.extract_function_id,
        ));

        Ok(Self {
            config,
            session,
            account,
            sessions,
            documents,
            files,
            assets,
            jobs,
        })
    }

    /// 显式指定的用户，否则为当前登录用户
    fn owner(&self, user: Option<String>) -> Result<String, ApplicationError> {
        user.or_else(|| self.session.as_ref().map(|s| s.user_id.clone()))
            .ok_or_else(|| ApplicationError::AuthError("Not logged in; pass --user or run `execudoc login`".to_string()))
    }
}

fn document_id(raw: String) -> Result<DocumentId, ApplicationError> {
    DocumentId::new(raw).map_err(|_| ApplicationError::validation("Missing document id"))
}

/// 根据扩展名猜测 MIME 类型
fn guess_mime(path: &std::path::Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "m4a" => "audio/mp4",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => return None,
    };
    Some(mime.to_string())
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn build_engine(config: &AppConfig) -> anyhow::Result<Arc<dyn PlaybackEnginePort>> {
    match config.player.engine {
        EngineKind::Simulated => Ok(Arc::new(SimulatedPlaybackEngine::new(Some(Duration::from_millis(
            config.player.simulated_duration_ms,
        ))))),
        #[cfg(feature = "rodio-playback")]
        EngineKind::Rodio => Ok(Arc::new(
            execudoc::infrastructure::adapters::RodioPlaybackEngine::spawn()?,
        )),
        #[cfg(not(feature = "rodio-playback"))]
        EngineKind::Rodio => anyhow::bail!("This build has no audio output; rebuild with --features rodio-playback"),
    }
}

async fn listen(services: &Services, document_id: DocumentId, source: TextSource) -> anyhow::Result<()> {
    let config = &services.config;
    let resolver = ResolveListenTextHandler::new(
        services.jobs.clone(),
        services.documents.clone(),
        services.files.clone(),
        config.features,
    );
    let text = resolver
        .handle(ResolveListenText {
            document_id: document_id.clone(),
            source,
        })
        .await?;
    println!("Listening to \"{}\" ({})", text.title, text.source.as_str());

    let synthesizer = Arc::new(
        HttpTtsClient::new(
            HttpTtsClientConfig::new(&config.tts.url)
                .with_timeout(config.tts.timeout_secs)
                .with_bucket(&config.tts.bucket_id)
                .with_project(&config.backend.project_id),
        )
        .map_err(|e| anyhow::anyhow!("Failed to create TTS client: {}", e))?,
    );

    let player_config = PlayerConfig {
        use_db: config.features.use_db,
        max_manifest_entries: config.player.max_manifest_entries,
        ..PlayerConfig::default()
    };
    let controller = AudioController::mount(
        player_config,
        Some(document_id),
        synthesizer,
        services.assets.clone(),
        build_engine(config)?,
        Some(services.documents.clone()),
    );

    let mut events = controller.subscribe();
    let outcome = controller.generate_and_play(text.text).await;
    if let PlayOutcome::Failed(message) = outcome {
        controller.unmount().await;
        anyhow::bail!(message);
    }

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(PlayerEvent::StatusChanged { from, to, error, .. }) => {
                    match error {
                        Some(error) => println!("{} -> {}: {}", from, to, error),
                        None => println!("{} -> {}", from, to),
                    }
                    if matches!(to, PlaybackStatus::Idle | PlaybackStatus::Error) {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Status events lagged");
                }
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received interrupt, stopping playback");
                controller.stop().await;
            }
        }
    }

    let error = controller.error();
    controller.unmount().await;
    match error {
        Some(message) => anyhow::bail!(message),
        None => Ok(()),
    }
}

async fn run(services: Services, command: Command) -> anyhow::Result<()> {
    let flags = services.config.features;

    match command {
        Command::Register { email, password, name } => {
            let handler = RegisterHandler::new(services.account.clone(), services.sessions.clone());
            let user = handler.handle(Register { email, password, name }).await?;
            println!("Registered and logged in as {} <{}>", user.id, user.email);
        }
        Command::Login { email, password } => {
            let handler = LoginHandler::new(services.account.clone(), services.sessions.clone());
            let user = handler.handle(Login { email, password }).await?;
            println!("Logged in as {} <{}>", user.id, user.email);
        }
        Command::Logout => {
            let handler = LogoutHandler::new(services.account.clone(), services.sessions.clone());
            if handler.handle(Logout).await? {
                println!("Logged out");
            } else {
                println!("Not logged in");
            }
        }
        Command::Whoami { jwt } => {
            let handler = GetCurrentUserHandler::new(services.account.clone(), services.sessions.clone());
            match handler.handle(GetCurrentUser).await? {
                Some(user) => {
                    print_json(&user)?;
                    if jwt {
                        let handler = IssueJwtHandler::new(services.account.clone(), services.sessions.clone());
                        println!("{}", handler.handle(IssueJwt).await?);
                    }
                }
                None => println!("Not logged in"),
            }
        }
        Command::Upload { path, user, mime } => {
            let user = services.owner(user)?;
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            let mime_type = mime.or_else(|| guess_mime(&path));
            let handler = UploadDocumentHandler::new(services.documents.clone(), services.files.clone());
            let document = handler
                .handle(UploadDocument {
                    user_id: user,
                    file: UploadFile { name, mime_type, path },
                })
                .await?;
            println!("{}", document.id());
        }
        Command::List { user } => {
            let user = services.owner(user)?;
            let handler = ListUserDocumentsHandler::new(services.documents.clone());
            let documents = handler.handle(ListUserDocuments { user_id: user }).await?;
            print_json(&documents)?;
        }
        Command::Extract { document_id: id } => {
            let handler = ExtractTextHandler::new(
                services.jobs.clone(),
                services.documents.clone(),
                services.files.clone(),
                flags,
            );
            let text = handler
                .handle(ExtractDocumentText {
                    document_id: document_id(id)?,
                })
                .await?;
            println!("{}", text);
        }
        Command::Summarize { document_id: id } => {
            let handler = SummarizeHandler::new(
                services.jobs.clone(),
                services.documents.clone(),
                services.files.clone(),
                flags,
            );
            let summary = handler
                .handle(SummarizeDocument {
                    document_id: document_id(id)?,
                })
                .await?;
            println!("{}", summary);
        }
        Command::Listen { document_id: id, source } => {
            listen(&services, document_id(id)?, source.into()).await?;
        }
        Command::Delete { document_id: id } => {
            let handler = DeleteDocumentHandler::new(
                services.documents.clone(),
                services.files.clone(),
                services.assets.clone(),
            );
            let response = handler
                .handle(DeleteDocument {
                    document_id: document_id(id)?,
                })
                .await?;
            println!(
                "Deleted {} (file: {}, audio: {})",
                response.document_id,
                if response.file_deleted { "removed" } else { "kept" },
                response.audio_deleted
            );
            for failure in &response.failures {
                eprintln!("warning: {}", failure);
            }
        }
        Command::Url { document_id: id } => {
            let handler = GetFileUrlsHandler::new(services.documents.clone(), services.files.clone());
            let urls = handler
                .handle(GetFileUrls {
                    document_id: document_id(id)?,
                })
                .await?;
            print_json(&urls)?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config_from_path(args.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    // 初始化日志（输出到 stderr，stdout 留给命令结果）
    let level = if args.verbose { "debug" } else { config.log.level.as_str() };
    let log_filter = format!("{},execudoc={}", level, level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.log.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    print_config(&config);

    let services = Services::build(config).await?;
    if let Err(e) = run(services, args.command).await {
        // 应用层错误只输出面向用户的信息
        if let Some(app_error) = e.downcast_ref::<ApplicationError>() {
            anyhow::bail!(app_error.user_message());
        }
        return Err(e);
    }

    Ok(())
}
