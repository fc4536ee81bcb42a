use crate::controller::Event;
use crate::media_store::MediaChange;
use tokio::sync::{broadcast, mpsc};

/// Forwards shared-index changes to the controller as [`Event::MediaChanged`]
///
/// Runs until either side of the bridge closes. Missed notifications after a
/// lag collapse into a single event, since every event triggers a full reload.
pub async fn forward_media_changes(
    mut changes: broadcast::Receiver<MediaChange>,
    events: mpsc::UnboundedSender<Event>,
) {
    loop {
        match changes.recv().await {
            Ok(change) => {
                log::debug!("Media change {:?} on {}", change.kind, change.uri);
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                let drained = drain_backlog(&mut changes);
                log::debug!("Media observer lagged by {} changes", missed + drained);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }

        if events.send(Event::MediaChanged).is_err() {
            break;
        }
    }
    log::debug!("Media observer stopped");
}

/// Discards whatever is still buffered; one reload covers all of it
fn drain_backlog(changes: &mut broadcast::Receiver<MediaChange>) -> u64 {
    let mut drained = 0;
    loop {
        match changes.try_recv() {
            Ok(_) => drained += 1,
            Err(broadcast::error::TryRecvError::Lagged(missed)) => drained += missed,
            Err(_) => return drained,
        }
    }
}
