use assistant_core::speech::{ListenFuture, SpeakFuture, SpeechInput, SpeechOutput};
use assistant_core::telemetry::LogContext;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin, Stdout};
use tracing::{debug, warn};

/// Reads one utterance per line from stdin.
pub struct ConsoleInput {
    lines: Lines<BufReader<Stdin>>,
    prompt: Stdout,
    closed: bool,
    log: LogContext,
}

impl ConsoleInput {
    pub fn new(log: LogContext) -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
            prompt: tokio::io::stdout(),
            closed: false,
            log,
        }
    }

    async fn read_utterance(&mut self) -> String {
        if let Err(err) = self.prompt.write_all("Слушаю...\n".as_bytes()).await {
            warn!(parent: self.log.span(), error = %err, "failed to write prompt");
        }
        let _ = self.prompt.flush().await;

        match self.lines.next_line().await {
            Ok(Some(line)) => {
                let heard = line.trim().to_string();
                debug!(parent: self.log.span(), heard = %heard, "utterance received");
                heard
            }
            Ok(None) => {
                self.closed = true;
                String::new()
            }
            Err(err) => {
                warn!(parent: self.log.span(), error = %err, "failed to read utterance");
                String::new()
            }
        }
    }
}

impl SpeechInput for ConsoleInput {
    fn listen(&mut self) -> ListenFuture<'_> {
        Box::pin(self.read_utterance())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Prints replies as `Джарвис: <text>`.
pub struct ConsoleOutput {
    stdout: Stdout,
    log: LogContext,
}

impl ConsoleOutput {
    pub fn new(log: LogContext) -> Self {
        Self {
            stdout: tokio::io::stdout(),
            log,
        }
    }

    async fn write_reply(&mut self, text: &str) {
        let line = format!("Джарвис: {text}\n");
        if let Err(err) = self.stdout.write_all(line.as_bytes()).await {
            warn!(parent: self.log.span(), error = %err, "failed to write reply");
            return;
        }
        let _ = self.stdout.flush().await;
    }
}

impl SpeechOutput for ConsoleOutput {
    fn speak<'a>(&'a mut self, text: &'a str) -> SpeakFuture<'a> {
        Box::pin(self.write_reply(text))
    }
}
