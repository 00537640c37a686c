// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The downstream side of a pipeline. See [`Publisher`] and [`Subscription`].

use super::{AbortReason, HandoffError, WorkerLiveness};
use crate::{FlowEvent, LivenessState, Sink};
use std::{num::NonZeroUsize,
          pin::Pin,
          sync::{Arc,
                 atomic::{AtomicBool, Ordering}},
          task::{Context, Poll}};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

/// Messages from the downstream handles to the worker.
#[derive(Debug)]
pub enum DownstreamControl<K> {
    /// Bind `K` as the one and only sink.
    Subscribe(K),
    /// Add to outstanding demand.
    Request(usize),
    /// The subscriber went away.
    Cancel,
}

/// The [`Sink`] a [`Subscription`] is fed through. Lives on the worker thread and
/// forwards every [`FlowEvent`] across a channel to the subscriber's task.
#[derive(Debug)]
pub struct ChannelSink<T> {
    tx: UnboundedSender<FlowEvent<T>>,
}

impl<T> ChannelSink<T> {
    fn send(&self, event: FlowEvent<T>) {
        // The subscription sends Cancel when it drops, so nothing to do here.
        drop(self.tx.send(event));
    }
}

impl<T> Sink<T> for ChannelSink<T> {
    fn on_next(&mut self, item: T) { self.send(FlowEvent::Next(item)); }

    fn on_complete(&mut self) { self.send(FlowEvent::Complete); }

    fn on_error(&mut self, reason: AbortReason) { self.send(FlowEvent::Error(reason)); }
}

/// The downstream-observable handle returned by [`create_pipeline()`].
///
/// A pipeline has exactly one subscriber. [`subscribe()`] hands out the
/// [`Subscription`] the first time and [`HandoffError::AlreadySubscribed`] after that.
/// Clones share this limit.
///
/// A terminal event that happens before anyone subscribes (e.g. producers closed an
/// empty pipeline) is held by the worker and delivered to the subscriber when it
/// arrives. Dropping every [`Publisher`] clone without subscribing cancels the pipeline.
///
/// [`create_pipeline()`]: super::create_pipeline
/// [`subscribe()`]: Self::subscribe
#[derive(Debug)]
pub struct Publisher<T> {
    control_tx: UnboundedSender<DownstreamControl<ChannelSink<T>>>,
    subscribed: Arc<AtomicBool>,
    liveness: Arc<WorkerLiveness>,
    batch_size: NonZeroUsize,
}

impl<T> Clone for Publisher<T> {
    fn clone(&self) -> Self {
        Self {
            control_tx: self.control_tx.clone(),
            subscribed: Arc::clone(&self.subscribed),
            liveness: Arc::clone(&self.liveness),
            batch_size: self.batch_size,
        }
    }
}

impl<T> Publisher<T> {
    pub(crate) fn new(
        control_tx: UnboundedSender<DownstreamControl<ChannelSink<T>>>,
        liveness: Arc<WorkerLiveness>,
        batch_size: NonZeroUsize,
    ) -> Self {
        Self {
            control_tx,
            subscribed: Arc::new(AtomicBool::new(false)),
            liveness,
            batch_size,
        }
    }

    /// Attaches the one and only subscriber.
    ///
    /// # Errors
    ///
    /// - [`HandoffError::AlreadySubscribed`] if this pipeline already has a subscriber.
    /// - [`HandoffError::WorkerGone`] if the worker thread has exited.
    pub fn subscribe(&self) -> Result<Subscription<T>, HandoffError> {
        if self.liveness.state() == LivenessState::Terminated {
            return Err(HandoffError::WorkerGone);
        }
        if self.subscribed.swap(true, Ordering::SeqCst) {
            return Err(HandoffError::AlreadySubscribed);
        }

        let (events_tx, events_rx) = unbounded_channel();
        self.control_tx
            .send(DownstreamControl::Subscribe(ChannelSink { tx: events_tx }))
            .map_err(|_| HandoffError::WorkerGone)?;

        Ok(Subscription {
            events_rx,
            control_tx: self.control_tx.clone(),
            outstanding: 0,
            batch_size: self.batch_size,
            finished: false,
        })
    }

    #[must_use]
    pub fn liveness(&self) -> LivenessState { self.liveness.state() }

    /// Generation of this pipeline's worker thread. Appears in the thread's name.
    #[must_use]
    pub fn generation(&self) -> u8 { self.liveness.generation() }

    #[must_use]
    pub fn batch_size(&self) -> usize { self.batch_size.get() }
}

/// The subscriber's end of a pipeline.
///
/// Items only flow when demand exists. There are two ways to create it:
///
/// | Usage                             | Demand                                          |
/// | :-------------------------------- | :---------------------------------------------- |
/// | [`request()`] + [`recv()`]        | Manual. [`recv()`] waits forever without it.    |
/// | [`Stream`] (e.g. `StreamExt::next`) | Automatic: `batch_size` at a time, whenever the previous batch has been received |
///
/// # Termination
///
/// - Normal completion (producers closed, everything drained): [`recv()`] returns
///   [`None`].
/// - Abort: [`recv()`] returns `Some(Err(reason))` once, then [`None`].
/// - Worker died without a terminal event: same as abort, with
///   [`AbortReason::worker_exited()`] as the reason.
/// - Dropping the subscription cancels the pipeline. Buffered items are discarded and
///   blocked producers are released with [`Push::Closed`].
///
/// [`Push::Closed`]: super::Push::Closed
/// [`Stream`]: futures_core::Stream
/// [`recv()`]: Self::recv
/// [`request()`]: Self::request
#[derive(Debug)]
pub struct Subscription<T> {
    events_rx: UnboundedReceiver<FlowEvent<T>>,
    control_tx: UnboundedSender<DownstreamControl<ChannelSink<T>>>,
    outstanding: usize,
    batch_size: NonZeroUsize,
    finished: bool,
}

impl<T> Unpin for Subscription<T> {}

impl<T> Subscription<T> {
    /// Asks for `n` more items. Zero is ignored.
    pub fn request(&mut self, n: usize) {
        if n == 0 || self.finished {
            return;
        }
        self.outstanding = self.outstanding.saturating_add(n);
        // If the worker is gone, recv() will report the end of the stream.
        drop(self.control_tx.send(DownstreamControl::Request(n)));
    }

    /// Items requested but not yet received.
    #[must_use]
    pub fn outstanding(&self) -> usize { self.outstanding }

    /// Waits for the next item or terminal event. Does not request anything by itself.
    pub async fn recv(&mut self) -> Option<Result<T, AbortReason>> {
        if self.finished {
            return None;
        }
        let event = self.events_rx.recv().await;
        self.on_event(event)
    }

    fn on_event(&mut self, event: Option<FlowEvent<T>>) -> Option<Result<T, AbortReason>> {
        match event {
            Some(FlowEvent::Next(item)) => {
                self.outstanding = self.outstanding.saturating_sub(1);
                Some(Ok(item))
            }
            Some(FlowEvent::Error(reason)) => {
                self.finished = true;
                Some(Err(reason))
            }
            Some(FlowEvent::Complete) => {
                self.finished = true;
                None
            }
            // The sink was dropped without a terminal event, so the worker died (panic
            // while discarding items, or before it saw the subscription). Items may have
            // been lost, which is never a normal completion.
            None => {
                self.finished = true;
                Some(Err(AbortReason::worker_exited()))
            }
        }
    }
}

impl<T> futures_core::Stream for Subscription<T> {
    type Item = Result<T, AbortReason>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }
        if this.outstanding == 0 {
            this.request(this.batch_size.get());
        }
        match this.events_rx.poll_recv(cx) {
            Poll::Ready(event) => Poll::Ready(this.on_event(event)),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) { drop(self.control_tx.send(DownstreamControl::Cancel)); }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use pretty_assertions::assert_eq;

    /// A publisher whose "worker" is the test itself, reading the control channel.
    fn setup() -> (
        Publisher<u32>,
        UnboundedReceiver<DownstreamControl<ChannelSink<u32>>>,
    ) {
        let (control_tx, control_rx) = unbounded_channel();
        let publisher = Publisher::new(
            control_tx,
            Arc::new(WorkerLiveness::new()),
            NonZeroUsize::new(2).unwrap(),
        );
        (publisher, control_rx)
    }

    fn take_sink(
        control_rx: &mut UnboundedReceiver<DownstreamControl<ChannelSink<u32>>>,
    ) -> ChannelSink<u32> {
        match control_rx.try_recv() {
            Ok(DownstreamControl::Subscribe(sink)) => sink,
            other => panic!("expected Subscribe, got {other:?}"),
        }
    }

    #[test]
    fn test_second_subscribe_is_refused() {
        let (publisher, _control_rx) = setup();
        let _subscription = publisher.subscribe().unwrap();
        assert!(matches!(
            publisher.clone().subscribe(),
            Err(HandoffError::AlreadySubscribed)
        ));
    }

    #[test]
    fn test_subscribe_after_worker_exit_fails() {
        let (publisher, _control_rx) = setup();
        publisher.liveness.mark_terminated();
        assert_eq!(publisher.liveness(), LivenessState::Terminated);
        assert!(matches!(publisher.subscribe(), Err(HandoffError::WorkerGone)));
    }

    #[tokio::test]
    async fn test_recv_tracks_demand_and_terminates_on_error() {
        let (publisher, mut control_rx) = setup();
        let mut subscription = publisher.subscribe().unwrap();
        let mut sink = take_sink(&mut control_rx);

        subscription.request(0);
        subscription.request(3);
        assert!(matches!(
            control_rx.try_recv(),
            Ok(DownstreamControl::Request(3))
        ));
        assert_eq!(subscription.outstanding(), 3);

        sink.on_next(10);
        sink.on_error(AbortReason::new("boom"));
        assert_eq!(subscription.recv().await, Some(Ok(10)));
        assert_eq!(subscription.outstanding(), 2);
        assert_eq!(
            subscription.recv().await,
            Some(Err(AbortReason::new("boom")))
        );
        assert_eq!(subscription.recv().await, None);

        // Demand is no longer forwarded once finished.
        subscription.request(1);
        assert!(control_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stream_requests_batch_size_at_a_time() {
        let (publisher, mut control_rx) = setup();
        let mut subscription = publisher.subscribe().unwrap();
        let mut sink = take_sink(&mut control_rx);

        sink.on_next(1);
        sink.on_next(2);
        sink.on_next(3);
        sink.on_complete();

        assert_eq!(subscription.next().await, Some(Ok(1)));
        assert!(matches!(
            control_rx.try_recv(),
            Ok(DownstreamControl::Request(2))
        ));
        assert_eq!(subscription.next().await, Some(Ok(2)));
        assert!(control_rx.try_recv().is_err());

        // Outstanding hit zero, so the next poll asks for another batch.
        assert_eq!(subscription.next().await, Some(Ok(3)));
        assert!(matches!(
            control_rx.try_recv(),
            Ok(DownstreamControl::Request(2))
        ));
        assert_eq!(subscription.next().await, None);
    }

    #[tokio::test]
    async fn test_sink_dropped_without_terminal_event_is_a_failure() {
        let (publisher, mut control_rx) = setup();
        let mut subscription = publisher.subscribe().unwrap();
        let mut sink = take_sink(&mut control_rx);

        sink.on_next(7);
        drop(sink);

        assert_eq!(subscription.recv().await, Some(Ok(7)));
        assert_eq!(
            subscription.recv().await,
            Some(Err(AbortReason::worker_exited()))
        );
        assert_eq!(subscription.recv().await, None);
        assert_eq!(subscription.next().await, None);
    }

    #[test]
    fn test_dropping_subscription_sends_cancel() {
        let (publisher, mut control_rx) = setup();
        let subscription = publisher.subscribe().unwrap();
        drop(take_sink(&mut control_rx));
        drop(subscription);
        assert!(matches!(
            control_rx.try_recv(),
            Ok(DownstreamControl::Cancel)
        ));
    }
}
