use std::future::Future;
use std::pin::Pin;

pub type ListenFuture<'a> = Pin<Box<dyn Future<Output = String> + Send + 'a>>;
pub type SpeakFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Source of user utterances.
pub trait SpeechInput: Send {
    /// Next utterance. Recognition failures are logged by the implementation
    /// and come back as an empty string.
    fn listen(&mut self) -> ListenFuture<'_>;

    /// True once no further utterances can arrive.
    fn is_closed(&self) -> bool {
        false
    }
}

/// Sink for assistant replies.
pub trait SpeechOutput: Send {
    fn speak<'a>(&'a mut self, text: &'a str) -> SpeakFuture<'a>;
}
