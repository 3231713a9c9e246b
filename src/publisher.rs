use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::messages::{Message, Topic};

/// Fire-and-forget: never blocks the caller and never reports failure.
pub trait Publisher: Send + 'static {
    fn publish(&self, message: Message);
}

fn topic_index(topic: Topic) -> usize {
    match topic {
        Topic::ColorImage => 0,
        Topic::DepthPoints => 1,
        Topic::Skeletons => 2,
        Topic::Users => 3,
        Topic::PersonAppeared => 4,
        Topic::PersonDisappeared => 5,
    }
}

struct Lane {
    tx: Sender<Message>,
    evict_rx: Receiver<Message>,
}

pub struct ChannelPublisher {
    lanes: Vec<Lane>,
}

/// Receiving ends of a [`ChannelPublisher`], one per topic.
pub struct Subscribers {
    receivers: Vec<(Topic, Receiver<Message>)>,
}

pub fn channel_publisher() -> (ChannelPublisher, Subscribers) {
    let mut lanes = Vec::with_capacity(Topic::ALL.len());
    let mut receivers = Vec::with_capacity(Topic::ALL.len());
    for topic in Topic::ALL {
        let (tx, rx) = bounded(topic.queue_depth());
        lanes.push(Lane {
            tx,
            evict_rx: rx.clone(),
        });
        receivers.push((topic, rx));
    }
    (ChannelPublisher { lanes }, Subscribers { receivers })
}

impl Publisher for ChannelPublisher {
    fn publish(&self, message: Message) {
        let lane = &self.lanes[topic_index(message.topic())];
        match lane.tx.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(message)) => {
                // Keep the newest: drop the oldest queued message and retry once.
                let _ = lane.evict_rx.try_recv();
                let _ = lane.tx.try_send(message);
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

impl Subscribers {
    #[cfg(test)]
    pub fn receiver(&self, topic: Topic) -> &Receiver<Message> {
        &self.receivers[topic_index(topic)].1
    }

    pub fn into_receivers(self) -> Vec<(Topic, Receiver<Message>)> {
        self.receivers
    }
}

/// Drains whatever is queued behind `message` and returns the newest along
/// with how many messages were taken in total.
pub fn take_latest(rx: &Receiver<Message>, mut message: Message) -> (Message, u64) {
    let mut taken = 1;
    while let Ok(newer) = rx.try_recv() {
        message = newer;
        taken += 1;
    }
    (message, taken)
}

/// Publisher that keeps everything it is given, for tests.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct RecordingPublisher {
    messages: std::sync::Arc<std::sync::Mutex<Vec<Message>>>,
}

#[cfg(test)]
impl RecordingPublisher {
    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().unwrap().clone()
    }

    pub fn on_topic(&self, topic: Topic) -> Vec<Message> {
        self.messages()
            .into_iter()
            .filter(|m| m.topic() == topic)
            .collect()
    }
}

#[cfg(test)]
impl Publisher for RecordingPublisher {
    fn publish(&self, message: Message) {
        self.messages.lock().unwrap().push(message);
    }
}
