use crate::codec::Message;
use crate::traits::error::Result;

/// Subscriber callback invoked for every dispatched message of its type
///
/// Handlers run synchronously on the connection task, in registration
/// order. Keep them short: a slow handler delays every later frame.
///
/// # Errors
/// A returned error (or a panic) is logged and counted by the registry.
/// Delivery to the remaining handlers continues and the connection is
/// unaffected.
///
/// # Example
///
/// ```ignore
/// struct CheckInCounter {
///     seen: u64,
/// }
///
/// impl MessageHandler for CheckInCounter {
///     fn handle(&mut self, message: &Message) -> Result<()> {
///         if let Payload::CheckIn(_) = message.payload {
///             self.seen += 1;
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait MessageHandler: Send + 'static {
    fn handle(&mut self, message: &Message) -> Result<()>;
}

impl<F> MessageHandler for F
where
    F: FnMut(&Message) -> Result<()> + Send + 'static,
{
    fn handle(&mut self, message: &Message) -> Result<()> {
        self(message)
    }
}
