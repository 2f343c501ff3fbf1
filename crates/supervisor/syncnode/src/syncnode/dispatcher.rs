use super::SubscriptionHandler;
use alloy_primitives::ChainId;
use kona_syncnode_types::ManagedEvent;
use tracing::{debug, warn};

/// Routes every update carried by `event` to its handler.
///
/// Updates fire in the order reset, unsafe block, derivation update, L1 exhaustion and block
/// replacement. A failing handler does not stop the remaining ones.
pub async fn dispatch_managed_event<H>(handler: &H, chain_id: ChainId, event: Option<&ManagedEvent>)
where
    H: SubscriptionHandler + ?Sized,
{
    let Some(event) = event else {
        warn!(target: "supervisor::syncnode", %chain_id, "Received nil event");
        return;
    };

    if event.is_empty() {
        debug!(target: "supervisor::syncnode", %chain_id, "Received empty event");
        return;
    }

    debug!(target: "supervisor::syncnode", %chain_id, %event, "Received node event");

    if let Some(reset_id) = &event.reset
        && let Err(err) = handler.handle_reset(reset_id).await
    {
        warn!(
            target: "supervisor::syncnode",
            %chain_id,
            %err,
            %reset_id,
            "Failed to handle reset event"
        );
    }

    if let Some(unsafe_block) = &event.unsafe_block
        && let Err(err) = handler.handle_unsafe_block(unsafe_block).await
    {
        warn!(
            target: "supervisor::syncnode",
            %chain_id,
            %err,
            %unsafe_block,
            "Failed to handle unsafe block event"
        );
    }

    if let Some(derived_ref_pair) = &event.derivation_update
        && let Err(err) = handler.handle_derivation_update(derived_ref_pair).await
    {
        warn!(
            target: "supervisor::syncnode",
            %chain_id,
            %err,
            %derived_ref_pair,
            "Failed to handle derivation update event"
        );
    }

    if let Some(derived_ref_pair) = &event.exhaust_l1
        && let Err(err) = handler.handle_exhaust_l1(derived_ref_pair).await
    {
        warn!(
            target: "supervisor::syncnode",
            %chain_id,
            %err,
            %derived_ref_pair,
            "Failed to handle L1 exhaust event"
        );
    }

    if let Some(replacement) = &event.replace_block
        && let Err(err) = handler.handle_replace_block(replacement).await
    {
        warn!(
            target: "supervisor::syncnode",
            %chain_id,
            %err,
            %replacement,
            "Failed to handle block replacement event"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syncnode::{
        ManagedNodeError,
        mocks::{MockHandler, block, hash},
    };
    use kona_syncnode_types::{BlockReplacement, DerivedRefPair};
    use mockall::{Sequence, predicate::eq};

    const CHAIN_ID: ChainId = 10;

    fn full_event() -> ManagedEvent {
        ManagedEvent {
            reset: Some("reset requested".to_string()),
            unsafe_block: Some(block(20)),
            derivation_update: Some(DerivedRefPair::new(block(5), block(18))),
            exhaust_l1: Some(DerivedRefPair::new(block(6), block(19))),
            replace_block: Some(BlockReplacement::new(block(17), hash(99))),
        }
    }

    #[tokio::test]
    async fn test_all_updates_fire_in_order() {
        let mut handler = MockHandler::new();
        let mut seq = Sequence::new();

        handler
            .expect_handle_reset()
            .with(eq("reset requested"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        handler
            .expect_handle_unsafe_block()
            .with(eq(block(20)))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        handler
            .expect_handle_derivation_update()
            .with(eq(DerivedRefPair::new(block(5), block(18))))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        handler
            .expect_handle_exhaust_l1()
            .with(eq(DerivedRefPair::new(block(6), block(19))))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        handler
            .expect_handle_replace_block()
            .with(eq(BlockReplacement::new(block(17), hash(99))))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        dispatch_managed_event(&handler, CHAIN_ID, Some(&full_event())).await;
    }

    #[tokio::test]
    async fn test_failing_handler_does_not_stop_later_ones() {
        let mut handler = MockHandler::new();
        handler
            .expect_handle_reset()
            .times(1)
            .returning(|_| Err(ManagedNodeError::ChannelSendFailed("closed".to_string())));
        handler
            .expect_handle_unsafe_block()
            .times(1)
            .returning(|_| Err(ManagedNodeError::ChannelSendFailed("closed".to_string())));
        handler.expect_handle_derivation_update().times(1).returning(|_| Ok(()));
        handler.expect_handle_exhaust_l1().times(1).returning(|_| Ok(()));
        handler.expect_handle_replace_block().times(1).returning(|_| Ok(()));

        dispatch_managed_event(&handler, CHAIN_ID, Some(&full_event())).await;
    }

    #[tokio::test]
    async fn test_only_populated_updates_fire() {
        let mut handler = MockHandler::new();
        handler.expect_handle_reset().times(0);
        handler.expect_handle_unsafe_block().times(1).returning(|_| Ok(()));
        handler.expect_handle_derivation_update().times(0);
        handler.expect_handle_exhaust_l1().times(1).returning(|_| Ok(()));
        handler.expect_handle_replace_block().times(0);

        let event = ManagedEvent {
            unsafe_block: Some(block(20)),
            exhaust_l1: Some(DerivedRefPair::new(block(6), block(19))),
            ..Default::default()
        };
        dispatch_managed_event(&handler, CHAIN_ID, Some(&event)).await;
    }

    #[tokio::test]
    async fn test_empty_and_nil_events_are_skipped() {
        let mut handler = MockHandler::new();
        handler.expect_handle_reset().times(0);
        handler.expect_handle_unsafe_block().times(0);
        handler.expect_handle_derivation_update().times(0);
        handler.expect_handle_exhaust_l1().times(0);
        handler.expect_handle_replace_block().times(0);

        dispatch_managed_event(&handler, CHAIN_ID, Some(&ManagedEvent::default())).await;
        dispatch_managed_event(&handler, CHAIN_ID, None).await;
    }
}
