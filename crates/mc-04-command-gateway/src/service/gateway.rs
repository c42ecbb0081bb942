use super::lock::InteractiveLock;
use crate::adapters::LocalFileUploader;
use crate::domain::{
    Command, CommandSpec, GatewayConfig, GatewayError, Guard, PromptLabel, Reply,
};
use crate::ports::Prompter;
use mc_01_discovery::{DirectoryLocator, TopicListener};
use mc_02_session::{ElevationOutcome, SessionError, SessionState, SessionStatus};
use mc_03_media_cache::{MediaCache, PartialMediaRecord};
use shared_types::{
    AuthToken, CredentialHash, DirectoryService, FileHandler, MediaId, RemoteError, RemoteResult,
    TileSummary,
};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Single entry point for user commands.
///
/// Owns the session and the catalog cache; reads discovery through a
/// [`DirectoryLocator`]. Every command goes through [`CommandGateway::dispatch`],
/// which checks the command's guards, runs it, and turns any failure into a
/// [`Reply::Error`].
pub struct CommandGateway {
    locator: Arc<dyn DirectoryLocator>,
    session: SessionState,
    cache: MediaCache,
    prompter: Arc<dyn Prompter>,
    events: Option<Arc<dyn TopicListener>>,
    lock: InteractiveLock,
    config: GatewayConfig,
}

impl CommandGateway {
    pub fn new(
        locator: Arc<dyn DirectoryLocator>,
        session: SessionState,
        prompter: Arc<dyn Prompter>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            locator,
            session,
            cache: MediaCache::new(),
            prompter,
            events: None,
            lock: InteractiveLock::new(),
            config,
        }
    }

    /// Serve the `events` commands from `listener`.
    pub fn with_event_listener(mut self, listener: Arc<dyn TopicListener>) -> Self {
        self.events = Some(listener);
        self
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn cache(&self) -> &MediaCache {
        &self.cache
    }

    /// Handle for callers that must not redraw while a command runs.
    pub fn interactive_lock(&self) -> InteractiveLock {
        self.lock.clone()
    }

    /// Prompt string reflecting reachability and the session.
    pub fn prompt(&self) -> String {
        self.prompt_label().render(self.locator.is_reachable())
    }

    pub fn prompt_label(&self) -> PromptLabel {
        let session = self.session.session();
        PromptLabel::new(session.display_name(), session.is_elevated())
    }

    /// Parse and dispatch one input line. Blank lines yield `None`.
    pub fn execute_line(&mut self, line: &str) -> Option<Reply> {
        match Command::parse(line) {
            Ok(Some(command)) => Some(self.dispatch(command)),
            Ok(None) => None,
            Err(err) => Some(Reply::Error(err.to_string())),
        }
    }

    /// Run `command` if its guards hold.
    pub fn dispatch(&mut self, command: Command) -> Reply {
        let spec = command.kind().spec();
        let lock = self.lock.clone();
        let _held = spec.remote.then(|| lock.hold());

        match self.run_guarded(spec, command) {
            Ok(reply) => reply,
            Err(err) => {
                if err.is_refusal() {
                    debug!(command = spec.usage, reason = %err, "Command refused");
                } else {
                    warn!(command = spec.usage, error = %err, "Command failed");
                }
                self.absorb_failure(&err);
                Reply::Error(err.to_string())
            }
        }
    }

    fn run_guarded(
        &mut self,
        spec: &'static CommandSpec,
        command: Command,
    ) -> Result<Reply, GatewayError> {
        let mut elevated_here = false;
        for guard in spec.guards {
            match guard {
                Guard::Reachable => {
                    if !self.locator.is_reachable() {
                        return Err(GatewayError::NoActiveDirectory);
                    }
                }
                Guard::Authenticated => {
                    if self.session.session().is_anonymous() {
                        return Err(GatewayError::NotAuthenticated);
                    }
                }
                Guard::HasSelection => {
                    if self.cache.selected().is_none() {
                        return Err(GatewayError::NoSelection);
                    }
                }
                Guard::AsElevated => elevated_here = self.ensure_elevated()?,
            }
        }

        let result = self.run(command);
        if elevated_here {
            self.session.de_elevate();
        }
        result
    }

    /// Cache fixups that follow from a failure.
    fn absorb_failure(&mut self, err: &GatewayError) {
        if let GatewayError::Remote(RemoteError::WrongMediaId { media_id }) = err {
            if self.cache.evict(media_id).is_some() {
                info!(media_id = %media_id, "Media no longer exists, dropped from cache");
            }
        }
    }

    fn run(&mut self, command: Command) -> Result<Reply, GatewayError> {
        match command {
            Command::Status => Ok(Reply::Ok(self.status_report())),
            Command::Login { username } => self.login(username),
            Command::Logout => {
                self.logout();
                Ok(Reply::ok("Logged out"))
            }
            Command::Disconnect => {
                self.locator.disconnect();
                Ok(Reply::ok("Disconnected from directory announcements"))
            }
            Command::Reconnect { channel } => {
                self.locator.reconnect(channel.as_deref())?;
                let channel = self.locator.status().channel.unwrap_or_default();
                Ok(Reply::Ok(format!("Listening for announcements on {channel}")))
            }
            Command::SearchByName { name, exact } => {
                let directory = self.directory()?;
                let tiles = directory.catalog()?.tiles_by_name(&name, exact)?;
                Ok(self.merge_results(tiles))
            }
            Command::SearchByTags { tags, include_all } => {
                let directory = self.directory()?;
                let catalog = directory.catalog()?;
                let tiles = self.with_user_token(directory.as_ref(), |token| {
                    catalog.tiles_by_tags(&tags, include_all, token)
                })?;
                Ok(self.merge_results(tiles))
            }
            Command::ShowCatalog => Ok(Reply::Ok(self.catalog_listing())),
            Command::Select { media_id } => {
                let record = self.cache.select(&media_id)?;
                Ok(Reply::Ok(format!("Selected {record}")))
            }
            Command::Fetch => {
                let media_id = self.selected_id()?;
                let directory = self.directory()?;
                let catalog = directory.catalog()?;
                let media = self.with_user_token(directory.as_ref(), |token| {
                    catalog.tile(&media_id, token)
                })?;
                self.cache.merge([PartialMediaRecord::from_media(media)]);
                Ok(self.describe(&media_id))
            }
            Command::AddTags { tags } => {
                let media_id = self.selected_id()?;
                let directory = self.directory()?;
                let catalog = directory.catalog()?;
                self.with_user_token(directory.as_ref(), |token| {
                    catalog.add_tags(&media_id, &tags, token)
                })?;
                self.cache.add_tags(&media_id, &tags)?;
                Ok(self.describe(&media_id))
            }
            Command::RemoveTags { tags } => {
                let media_id = self.selected_id()?;
                let directory = self.directory()?;
                let catalog = directory.catalog()?;
                self.with_user_token(directory.as_ref(), |token| {
                    catalog.remove_tags(&media_id, &tags, token)
                })?;
                self.cache.remove_tags(&media_id, &tags)?;
                Ok(self.describe(&media_id))
            }
            Command::Download { path } => {
                let media_id = self.selected_id()?;
                let directory = self.directory()?;
                let target = self.download_target(&media_id, path);
                let bytes = self.download(directory.as_ref(), &media_id, &target)?;
                Ok(Reply::Ok(format!(
                    "Downloaded {bytes} bytes to {}",
                    target.display()
                )))
            }
            Command::Rename { name } => {
                let media_id = self.selected_id()?;
                let admin = self.admin_token()?;
                self.directory()?
                    .catalog()?
                    .rename_tile(&media_id, &name, &admin)?;
                self.cache.rename(&media_id, &name)?;
                Ok(self.describe(&media_id))
            }
            Command::Remove => {
                let media_id = self.selected_id()?;
                let admin = self.admin_token()?;
                self.directory()?
                    .file_service()?
                    .remove_file(&media_id, &admin)?;
                self.cache.evict(&media_id);
                Ok(Reply::Ok(format!("Removed {media_id}")))
            }
            Command::Upload { path } => {
                let admin = self.admin_token()?;
                let files = self.directory()?.file_service()?;
                let mut uploader = LocalFileUploader::open(&path)?;
                let media_id = files.upload_file(&mut uploader, &admin)?;
                info!(media_id = %media_id, bytes = uploader.sent(), "Upload complete");
                Ok(Reply::Ok(format!("Uploaded {} as {media_id}", path.display())))
            }
            Command::AddUser { username } => {
                let admin = self.admin_token()?;
                let password = self.prompter.prompt_secret(&format!("Password for {username}"))?;
                self.directory()?.authenticator()?.add_user(
                    &username,
                    &CredentialHash::derive(&password),
                    &admin,
                )?;
                Ok(Reply::Ok(format!("User {username} added")))
            }
            Command::RemoveUser { username } => {
                let admin = self.admin_token()?;
                self.directory()?
                    .authenticator()?
                    .remove_user(&username, &admin)?;
                Ok(Reply::Ok(format!("User {username} removed")))
            }
            Command::Admin => {
                let secret = self.prompter.prompt_secret("Administrator password")?;
                let directory = self.directory()?;
                match self.session.elevate(directory.as_ref(), &secret)? {
                    ElevationOutcome::Elevated => {
                        Ok(Reply::ok("Administrator privileges granted"))
                    }
                    ElevationOutcome::AlreadyElevated => {
                        Ok(Reply::ok("Already running with administrator privileges"))
                    }
                }
            }
            Command::Events => {
                let topics = self.event_listener()?.topics();
                if topics.is_empty() {
                    return Ok(Reply::ok("Not listening to any topic"));
                }
                let names: Vec<&str> = topics.iter().map(|t| t.as_str()).collect();
                Ok(Reply::Ok(format!("Listening to {}", names.join(", "))))
            }
            Command::EventsOn { topic } => {
                if self.event_listener()?.listen(topic)? {
                    Ok(Reply::Ok(format!("Listening to {topic} events")))
                } else {
                    Ok(Reply::Ok(format!("Already listening to {topic} events")))
                }
            }
            Command::EventsOff { topic } => {
                if self.event_listener()?.stop(topic) {
                    Ok(Reply::Ok(format!("Stopped listening to {topic} events")))
                } else {
                    Ok(Reply::Ok(format!("Not listening to {topic} events")))
                }
            }
            Command::Exit => {
                if self.session.de_elevate() {
                    Ok(Reply::ok("Administrator privileges dropped"))
                } else {
                    Ok(Reply::Exit)
                }
            }
        }
    }

    fn login(&mut self, username: Option<String>) -> Result<Reply, GatewayError> {
        let directory = self.directory()?;
        let username = match username {
            Some(username) => username,
            None => self.prompter.prompt("Username")?,
        };
        let password = self.prompter.prompt_secret("Password")?;

        // Tags are per user; whatever is cached belongs to the previous one.
        self.cache.clear();
        self.session.login(directory.as_ref(), &username, &password)?;
        Ok(Reply::Ok(format!("Logged in as {username}")))
    }

    fn logout(&mut self) {
        self.session.logout();
        self.cache.clear();
    }

    /// Elevate for one command. Returns whether this call did the elevating.
    fn ensure_elevated(&mut self) -> Result<bool, GatewayError> {
        if self.session.session().is_elevated() {
            return Ok(false);
        }
        let secret = self.prompter.prompt_secret("Administrator password")?;
        let directory = self.directory()?;
        let outcome = self.session.elevate(directory.as_ref(), &secret)?;
        Ok(outcome == ElevationOutcome::Elevated)
    }

    fn event_listener(&self) -> Result<&dyn TopicListener, GatewayError> {
        self.events.as_deref().ok_or(GatewayError::NoEventListener)
    }

    fn directory(&self) -> Result<Arc<dyn DirectoryService>, GatewayError> {
        self.locator
            .select_active()
            .ok_or(GatewayError::NoActiveDirectory)
    }

    fn selected_id(&self) -> Result<MediaId, GatewayError> {
        self.cache
            .selected_id()
            .cloned()
            .ok_or(GatewayError::NoSelection)
    }

    fn admin_token(&self) -> Result<AuthToken, GatewayError> {
        self.session
            .admin_token()
            .cloned()
            .ok_or(GatewayError::NotElevated)
    }

    /// Run `call` with the user's token. On `Unauthorized` the token is
    /// refreshed once and the call repeated once. A rejected refresh logs
    /// the user out.
    fn with_user_token<T>(
        &mut self,
        directory: &dyn DirectoryService,
        mut call: impl FnMut(&AuthToken) -> RemoteResult<T>,
    ) -> Result<T, GatewayError> {
        let token = self.user_token()?;
        match call(&token) {
            Err(RemoteError::Unauthorized) => {
                debug!("Token rejected, refreshing");
                if let Err(err) = self.session.refresh(directory) {
                    if err == SessionError::CredentialsRejected {
                        warn!("Token refresh rejected, logging out");
                        self.logout();
                    }
                    return Err(err.into());
                }
                let token = self.user_token()?;
                Ok(call(&token)?)
            }
            other => Ok(other?),
        }
    }

    fn user_token(&self) -> Result<AuthToken, GatewayError> {
        self.session
            .session()
            .user_token()
            .cloned()
            .ok_or(GatewayError::NotAuthenticated)
    }

    fn merge_results(&mut self, tiles: Vec<TileSummary>) -> Reply {
        let ids: Vec<MediaId> = tiles.iter().map(|t| t.id.clone()).collect();
        self.cache
            .merge(tiles.into_iter().map(PartialMediaRecord::from));
        if ids.is_empty() {
            return Reply::ok("No results");
        }
        let lines: Vec<String> = ids
            .iter()
            .filter_map(|id| self.cache.get(id))
            .map(ToString::to_string)
            .collect();
        Reply::Ok(lines.join("\n"))
    }

    fn describe(&self, media_id: &MediaId) -> Reply {
        match self.cache.get(media_id) {
            Some(record) => Reply::Ok(record.to_string()),
            None => Reply::Ok(format!("{media_id}. Nothing to show")),
        }
    }

    fn catalog_listing(&self) -> String {
        if self.cache.is_empty() {
            return "Catalog cache is empty".to_string();
        }
        let selected = self.cache.selected_id();
        self.cache
            .iter()
            .map(|record| {
                let marker = if Some(&record.id) == selected { "*" } else { " " };
                format!("{marker} {record}")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn status_report(&self) -> String {
        let discovery = self.locator.status();
        let mut lines = vec![format!(
            "Directory: {}",
            if discovery.reachability.is_reachable() {
                "reachable"
            } else {
                "unreachable"
            }
        )];
        lines.push(match &discovery.channel {
            Some(channel) => format!("Channel: {channel}"),
            None => "Channel: not subscribed".to_string(),
        });
        for (instance, age_ms) in &discovery.instances {
            lines.push(format!("  {instance} (seen {}s ago)", age_ms / 1000));
        }

        let session = self.session.session();
        let state = match self.session.status() {
            SessionStatus::Anonymous => "anonymous",
            SessionStatus::Authenticated => "authenticated",
            SessionStatus::Elevated => "administrator",
        };
        lines.push(format!("Session: {} ({state})", session.display_name()));
        lines.push(match self.cache.selected() {
            Some(record) => format!("Selected: {record}"),
            None => "Selected: none".to_string(),
        });
        lines.push(format!("Cached records: {}", self.cache.len()));
        lines.join("\n")
    }

    fn download_target(&self, media_id: &MediaId, path: Option<PathBuf>) -> PathBuf {
        let file_name = self
            .cache
            .get(media_id)
            .and_then(|record| record.known_name())
            .map_or_else(|| media_id.to_string(), safe_file_name);
        match path {
            Some(path) if path.is_dir() => path.join(file_name),
            Some(path) => path,
            None => self.config.download_dir.join(file_name),
        }
    }

    fn download(
        &mut self,
        directory: &dyn DirectoryService,
        media_id: &MediaId,
        target: &Path,
    ) -> Result<u64, GatewayError> {
        let files = directory.file_service()?;
        let mut handler =
            self.with_user_token(directory, |token| files.open_file(media_id, token))?;
        let file = match File::create(target) {
            Ok(file) => file,
            Err(err) => {
                if let Err(close) = self.with_user_token(directory, |token| handler.close(token)) {
                    debug!(media_id = %media_id, error = %close, "Closing download failed");
                }
                return Err(err.into());
            }
        };
        let mut out = BufWriter::new(file);

        let received = self
            .receive_into(directory, handler.as_mut(), &mut out)
            .and_then(|bytes| {
                out.flush()?;
                Ok(bytes)
            });
        let closed = self.with_user_token(directory, |token| handler.close(token));

        match received {
            Ok(bytes) => {
                if let Err(err) = closed {
                    warn!(media_id = %media_id, error = %err, "Closing download failed");
                }
                info!(media_id = %media_id, bytes, path = %target.display(), "Download complete");
                Ok(bytes)
            }
            Err(err) => {
                drop(out);
                if let Err(io) = fs::remove_file(target) {
                    debug!(path = %target.display(), error = %io, "Partial download not removed");
                }
                Err(err)
            }
        }
    }

    /// Pull chunks until the handler reports end of file. An expired token
    /// is refreshed in flight and the transfer continues on the same
    /// handler.
    pub(crate) fn receive_into(
        &mut self,
        directory: &dyn DirectoryService,
        handler: &mut dyn FileHandler,
        out: &mut dyn Write,
    ) -> Result<u64, GatewayError> {
        let chunk_size = self.config.chunk_size;
        let mut written = 0u64;
        loop {
            let chunk =
                self.with_user_token(directory, |token| handler.receive(chunk_size, token))?;
            if chunk.is_empty() {
                return Ok(written);
            }
            out.write_all(&chunk)?;
            written += chunk.len() as u64;
        }
    }
}

fn safe_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c == '/' || c == '\\' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect()
}
