//! # Console
//!
//! Foreground side of the client: one queue of input events fed by a
//! terminal reader thread and the ctrl-c handler, a [`Prompter`] that reads
//! from the same queue, and the read-dispatch-print loop.
//!
//! ```text
//!                 ┌──────── ReadRequest (Line | Secret) ◀────────┐
//!                 ▼                                              │
//!  reader thread ──Line/Interrupt/Eof──┐                         │
//!                                      ├──▶ InputQueue ──▶ Console::run / ConsolePrompter
//!  ctrl-c task ───────Interrupt────────┘
//! ```
//!
//! The reader only touches the terminal when the queue asks for input, so a
//! secret can be read in raw mode without a line reader racing it. In raw
//! mode ctrl-c arrives as a key, and the reader reports it as an interrupt
//! itself.
//!
//! An interrupt while a command is prompting aborts that command only; at
//! the command prompt it just clears the line.

use crossterm::cursor::MoveToColumn;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::Print;
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::QueueableCommand;
use mc_04_command_gateway::{CommandGateway, Interrupted, PromptLabel, Prompter, Reply};
use parking_lot::Mutex;
use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use tracing::debug;

/// One foreground input event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Line(String),
    Interrupt,
    /// Input closed. Sticky: every later read sees it too.
    Eof,
}

/// What the foreground wants read next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadRequest {
    Line,
    /// A line read without echo.
    Secret,
}

/// Requests from the [`InputQueue`], consumed by the terminal reader.
#[derive(Debug)]
pub struct ReadRequests(mpsc::Receiver<ReadRequest>);

/// Producer half of the [`InputQueue`].
#[derive(Debug, Clone)]
pub struct InputSender(mpsc::Sender<Input>);

impl InputSender {
    /// Returns `false` once the queue is gone.
    pub fn send(&self, input: Input) -> bool {
        self.0.send(input).is_ok()
    }
}

/// Foreground input, in arrival order.
///
/// At most one read is outstanding at the reader. An interrupt does not
/// cancel it: the line it eventually yields answers the next read.
pub struct InputQueue {
    rx: Mutex<mpsc::Receiver<Input>>,
    requests: mpsc::Sender<ReadRequest>,
    reading: AtomicBool,
    closed: AtomicBool,
}

impl InputQueue {
    pub fn new() -> (Arc<Self>, InputSender, ReadRequests) {
        let (tx, rx) = mpsc::channel();
        let (requests, pending) = mpsc::channel();
        let queue = Arc::new(Self {
            rx: Mutex::new(rx),
            requests,
            reading: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        });
        (queue, InputSender(tx), ReadRequests(pending))
    }

    /// Block until the next event.
    pub fn next(&self) -> Input {
        self.read(ReadRequest::Line)
    }

    /// Like [`InputQueue::next`], with the line read without echo. A plain
    /// read already outstanding is not converted.
    pub fn next_secret(&self) -> Input {
        self.read(ReadRequest::Secret)
    }

    fn read(&self, request: ReadRequest) -> Input {
        if self.closed.load(Ordering::SeqCst) {
            return Input::Eof;
        }
        if !self.reading.swap(true, Ordering::SeqCst) && self.requests.send(request).is_err() {
            debug!("No terminal reader attached");
        }
        match self.rx.lock().recv() {
            Ok(Input::Eof) | Err(_) => {
                self.closed.store(true, Ordering::SeqCst);
                Input::Eof
            }
            Ok(Input::Line(line)) => {
                self.reading.store(false, Ordering::SeqCst);
                Input::Line(line)
            }
            Ok(Input::Interrupt) => Input::Interrupt,
        }
    }
}

/// Serve the queue's read requests from a dedicated thread.
///
/// Secrets are read key by key in raw mode when stdin is a terminal, and as
/// plain lines otherwise.
pub fn spawn_terminal_reader(
    sender: InputSender,
    requests: ReadRequests,
) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("terminal-reader".to_string())
        .spawn(move || {
            let stdin = io::stdin();
            let masked = stdin.is_terminal();
            let mut lines = stdin.lock().lines();
            for request in requests.0.iter() {
                let input = match request {
                    ReadRequest::Secret if masked => read_masked().unwrap_or_else(|e| {
                        debug!(error = %e, "Reading secret failed");
                        Input::Eof
                    }),
                    _ => match lines.next() {
                        Some(Ok(line)) => Input::Line(line),
                        Some(Err(e)) => {
                            debug!(error = %e, "Reading stdin failed");
                            Input::Eof
                        }
                        None => Input::Eof,
                    },
                };
                let eof = input == Input::Eof;
                if !sender.send(input) || eof {
                    return;
                }
            }
        })
}

fn read_masked() -> io::Result<Input> {
    terminal::enable_raw_mode()?;
    let input = read_masked_keys();
    terminal::disable_raw_mode()?;
    if matches!(input, Ok(Input::Line(_))) {
        let mut out = io::stdout();
        writeln!(out)?;
        out.flush()?;
    }
    input
}

fn read_masked_keys() -> io::Result<Input> {
    let mut secret = String::new();
    loop {
        if let Event::Key(key) = event::read()? {
            if let Some(input) = masked_key(&mut secret, key) {
                return Ok(input);
            }
        }
    }
}

/// Apply one key press to a secret being typed. Returns the finished input,
/// if the key ends it.
fn masked_key(secret: &mut String, key: KeyEvent) -> Option<Input> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Enter => Some(Input::Line(std::mem::take(secret))),
        KeyCode::Char('c') if ctrl => Some(Input::Interrupt),
        KeyCode::Char('d') if ctrl && secret.is_empty() => Some(Input::Eof),
        KeyCode::Char(_) if ctrl => None,
        KeyCode::Char(c) => {
            secret.push(c);
            None
        }
        KeyCode::Backspace => {
            secret.pop();
            None
        }
        _ => None,
    }
}

/// Output shared by the foreground loop, the prompter and the prompt
/// refresher.
pub struct Terminal {
    out: Mutex<Box<dyn Write + Send>>,
}

impl Terminal {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    pub fn print_line(&self, line: &str) {
        self.write(|out| writeln!(out, "{line}"));
    }

    /// Write `prompt` without a line break.
    pub fn print_prompt(&self, prompt: &str) {
        self.write(|out| write!(out, "{prompt}"));
    }

    /// Replace the current line with `prompt`.
    pub fn redraw_prompt(&self, prompt: &str) {
        self.write(|out| {
            out.queue(MoveToColumn(0))?
                .queue(Clear(ClearType::CurrentLine))?
                .queue(Print(prompt))?;
            Ok(())
        });
    }

    fn write(&self, f: impl FnOnce(&mut dyn Write) -> io::Result<()>) {
        let mut out = self.out.lock();
        if let Err(e) = f(out.as_mut()).and_then(|()| out.flush()) {
            debug!(error = %e, "Terminal write failed");
        }
    }
}

/// [`Prompter`] reading answers from the shared input queue.
pub struct ConsolePrompter {
    input: Arc<InputQueue>,
    terminal: Arc<Terminal>,
}

impl ConsolePrompter {
    pub fn new(input: Arc<InputQueue>, terminal: Arc<Terminal>) -> Self {
        Self { input, terminal }
    }

    fn ask(&self, label: &str, request: ReadRequest) -> Result<String, Interrupted> {
        self.terminal.print_prompt(&format!("{label}: "));
        let input = match request {
            ReadRequest::Line => self.input.next(),
            ReadRequest::Secret => self.input.next_secret(),
        };
        match input {
            Input::Line(line) => Ok(line.trim().to_string()),
            Input::Interrupt | Input::Eof => {
                self.terminal.print_line("");
                Err(Interrupted)
            }
        }
    }
}

impl Prompter for ConsolePrompter {
    fn prompt(&self, label: &str) -> Result<String, Interrupted> {
        self.ask(label, ReadRequest::Line)
    }

    fn prompt_secret(&self, label: &str) -> Result<String, Interrupted> {
        self.ask(label, ReadRequest::Secret)
    }
}

/// The foreground read-dispatch-print loop.
pub struct Console {
    gateway: CommandGateway,
    input: Arc<InputQueue>,
    terminal: Arc<Terminal>,
    label: Arc<Mutex<PromptLabel>>,
}

impl Console {
    pub fn new(gateway: CommandGateway, input: Arc<InputQueue>, terminal: Arc<Terminal>) -> Self {
        let label = Arc::new(Mutex::new(gateway.prompt_label()));
        Self {
            gateway,
            input,
            terminal,
            label,
        }
    }

    /// Latest prompt label, for redraws from other tasks.
    pub fn label(&self) -> Arc<Mutex<PromptLabel>> {
        Arc::clone(&self.label)
    }

    pub fn gateway(&self) -> &CommandGateway {
        &self.gateway
    }

    /// Run until `exit` or end of input.
    pub fn run(&mut self) {
        loop {
            *self.label.lock() = self.gateway.prompt_label();
            self.terminal.print_prompt(&self.gateway.prompt());

            match self.input.next() {
                Input::Line(line) => match self.gateway.execute_line(&line) {
                    Some(Reply::Exit) => break,
                    Some(reply) => self.terminal.print_line(&reply.to_string()),
                    None => {}
                },
                Input::Interrupt => self.terminal.print_line(""),
                Input::Eof => {
                    self.terminal.print_line("");
                    break;
                }
            }
        }
        debug!("Console loop finished");
    }
}
