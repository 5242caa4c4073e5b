use std::fmt;

use serde::Serialize;
use tokio::sync::mpsc;

use crate::runtime::RuntimeError;

/// Opaque reference to a surface a job exposes to the host.
///
/// The host owns the rendering; the handle only names the surface and, for
/// interactive jobs, carries the channel keystrokes are forwarded through.
#[derive(Clone)]
pub struct ViewHandle {
    id: String,
    title: String,
    input: Option<mpsc::UnboundedSender<Vec<u8>>>,
}

impl ViewHandle {
    /// A display-only view.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            input: None,
        }
    }

    /// A view that accepts input; the receiver belongs to the job.
    pub fn interactive(
        id: impl Into<String>,
        title: impl Into<String>,
    ) -> (Self, mpsc::UnboundedReceiver<Vec<u8>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let view = Self {
            id: id.into(),
            title: title.into(),
            input: Some(tx),
        };
        (view, rx)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_interactive(&self) -> bool {
        self.input.is_some()
    }

    /// Forward input to the job behind the view.
    pub fn send_input(&self, data: Vec<u8>) -> Result<(), RuntimeError> {
        let input = self
            .input
            .as_ref()
            .ok_or_else(|| RuntimeError::EmitFailed(format!("view {} is read-only", self.id)))?;
        input.send(data).map_err(|_| RuntimeError::ReceiverClosed)
    }
}

impl fmt::Debug for ViewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewHandle")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("interactive", &self.is_interactive())
            .finish()
    }
}

impl Serialize for ViewHandle {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("ViewHandle", 3)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("title", &self.title)?;
        state.serialize_field("interactive", &self.is_interactive())?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_interactive_view_forwards_input() {
        let (view, mut rx) = ViewHandle::interactive("bash_123456", "bash");
        view.send_input(b"ls\n".to_vec()).unwrap();
        assert_eq!(rx.recv().await.unwrap(), b"ls\n".to_vec());
    }

    #[test]
    fn test_read_only_view_rejects_input() {
        let view = ViewHandle::new("help", "Help");
        assert!(!view.is_interactive());
        assert!(view.send_input(vec![1]).is_err());
    }

    #[test]
    fn test_closed_view() {
        let (view, rx) = ViewHandle::interactive("v", "v");
        drop(rx);
        assert!(matches!(
            view.send_input(vec![1]),
            Err(RuntimeError::ReceiverClosed)
        ));
    }
}
