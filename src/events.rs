//! Snapshot streams for live progress

use async_stream::stream;
use futures_util::{Stream, StreamExt};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::progress::types::OperationSnapshot;

/// Turn a snapshot receiver into a finite stream of updates
///
/// The current snapshot comes first, so late subscribers see where the
/// operation stands. After that only changes are yielded; the terminal
/// snapshot is the last item. The stream also ends if the operation is
/// evicted while it is being watched.
pub fn progress_stream(
    receiver: watch::Receiver<OperationSnapshot>,
) -> impl Stream<Item = OperationSnapshot> + Send + 'static {
    stream! {
        let mut updates = WatchStream::new(receiver);
        while let Some(snapshot) = updates.next().await {
            let terminal = snapshot.status.is_terminal();
            yield snapshot;
            if terminal {
                break;
            }
        }
    }
}
