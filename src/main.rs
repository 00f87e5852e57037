use std::{process, sync::Arc};

use tokio::sync::watch;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;
use yatube::{
    application::{
        accounts::{AccountService, PasswordService},
        chrome::ChromeService,
        error::AppError,
        feed::FeedService,
        groups::{CreateGroupCommand, GroupService},
        pagination::Paginator,
        posts::PostService,
        repos::{
            GroupsRepo, GroupsWriteRepo, HealthRepo, PostsRepo, PostsWriteRepo, SessionsRepo,
            UsersRepo, UsersWriteRepo,
        },
    },
    config::{self, GroupsCommand, UsersCommand},
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, CookiePolicy, HttpState},
        password::Argon2PasswordService,
        telemetry,
    },
};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
        config::Command::Groups(args) => run_groups(settings, args.command).await,
        config::Command::Users(args) => run_users(settings, args.command).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let services = build_services(&repositories, &settings);

    let health: Arc<dyn HealthRepo> = repositories.clone();

    let state = HttpState {
        feed: services.feed,
        posts: services.posts,
        accounts: services.accounts,
        chrome: services.chrome,
        health,
        cookies: CookiePolicy {
            secure: settings.auth.secure_cookies,
        },
    };

    serve_http(&settings, state).await
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    init_repositories(&settings).await?;
    info!(target = "yatube::migrate", "Migrations applied");
    Ok(())
}

async fn run_groups(settings: config::Settings, command: GroupsCommand) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let reader: Arc<dyn GroupsRepo> = repositories.clone();
    let writer: Arc<dyn GroupsWriteRepo> = repositories;
    let groups = GroupService::new(reader, writer);

    match command {
        GroupsCommand::Create {
            title,
            slug,
            description,
        } => {
            let group = groups
                .create(CreateGroupCommand {
                    title,
                    slug,
                    description,
                })
                .await?;
            println!("{}\t{}", group.slug, group.title);
        }
        GroupsCommand::List => {
            for group in groups.list().await? {
                println!("{}\t{}", group.slug, group.title);
            }
        }
        GroupsCommand::Delete { slug } => groups.delete(&slug).await?,
    }

    Ok(())
}

async fn run_users(settings: config::Settings, command: UsersCommand) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let services = build_services(&repositories, &settings);

    match command {
        UsersCommand::Delete { username } => services.accounts.delete_user(&username).await?,
    }

    Ok(())
}

struct Services {
    feed: Arc<FeedService>,
    posts: Arc<PostService>,
    accounts: Arc<AccountService>,
    chrome: Arc<ChromeService>,
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn build_services(repositories: &Arc<PostgresRepositories>, settings: &config::Settings) -> Services {
    let posts_repo: Arc<dyn PostsRepo> = repositories.clone();
    let posts_write_repo: Arc<dyn PostsWriteRepo> = repositories.clone();
    let groups_repo: Arc<dyn GroupsRepo> = repositories.clone();
    let users_repo: Arc<dyn UsersRepo> = repositories.clone();
    let users_write_repo: Arc<dyn UsersWriteRepo> = repositories.clone();
    let sessions_repo: Arc<dyn SessionsRepo> = repositories.clone();
    let passwords: Arc<dyn PasswordService> = Arc::new(Argon2PasswordService::new());

    let feed = Arc::new(FeedService::new(
        posts_repo.clone(),
        groups_repo.clone(),
        users_repo.clone(),
        Paginator::new(settings.site.page_size.get()),
    ));
    let posts = Arc::new(PostService::new(posts_repo, posts_write_repo, groups_repo));
    let accounts = Arc::new(AccountService::new(
        users_repo,
        users_write_repo,
        sessions_repo,
        passwords,
        settings.auth.session_ttl,
    ));
    let chrome = Arc::new(ChromeService::new(settings.site.title.clone()));

    Services {
        feed,
        posts,
        accounts,
        chrome,
    }
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "yatube::serve",
        addr = %settings.server.addr,
        "Listening"
    );

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let mut server = tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.changed().await;
            })
            .await
    });

    tokio::select! {
        joined = &mut server => return server_outcome(joined),
        () = shutdown_signal() => {}
    }

    info!(target = "yatube::serve", "Shutting down");
    let _ = shutdown_tx.send(true);

    match tokio::time::timeout(settings.server.graceful_shutdown, server).await {
        Ok(joined) => server_outcome(joined),
        Err(_) => {
            warn!(
                target = "yatube::serve",
                timeout_secs = settings.server.graceful_shutdown.as_secs(),
                "Graceful shutdown timed out; dropping open connections"
            );
            Ok(())
        }
    }
}

fn server_outcome(
    joined: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), AppError> {
    joined
        .map_err(|err| AppError::unexpected(format!("server task failed: {err}")))?
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
