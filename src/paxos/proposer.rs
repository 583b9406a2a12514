use crate::error::RpcError;
use crate::paxos::messages::*;
use crate::paxos::peer::Paxos;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

enum PrepareOutcome<V> {
    Promised { accepted: Option<(Round, V)> },
    Rejected { highest: Option<Round> },
}

enum AcceptOutcome {
    Accepted,
    Rejected { highest: Option<Round> },
}

pub(crate) async fn run<V: Value>(px: Arc<Paxos<V>>, slot: Slot, value: V) {
    let me = px.me();
    let mut round = Round::initial(me);
    let mut attempt: u32 = 0;

    debug!(peer = me, slot, "proposer started");

    loop {
        if px.is_dead() {
            return;
        }
        match px.status(slot) {
            Fate::Pending => {}
            Fate::Decided(_) | Fate::Forgotten => {
                debug!(peer = me, slot, "proposer superseded");
                return;
            }
        }

        let highest = match prepare(&px, slot, round).await {
            PrepareOutcome::Promised { accepted } => {
                // A value some acceptor already holds wins over our own.
                let chosen = match accepted {
                    Some((_, adopted)) => adopted,
                    None => value.clone(),
                };
                match accept(&px, slot, round, chosen.clone()).await {
                    AcceptOutcome::Accepted => {
                        decide(&px, slot, round, chosen);
                        info!(peer = me, slot, round = %round, "proposal decided");
                        return;
                    }
                    AcceptOutcome::Rejected { highest } => highest,
                }
            }
            PrepareOutcome::Rejected { highest } => highest,
        };

        round = round.next_above(highest);
        trace!(peer = me, slot, round = %round, "retrying with higher round");

        let delay = {
            let mut rng = rand::thread_rng();
            px.retry().jittered(attempt, &mut rng)
        };
        attempt = attempt.saturating_add(1);
        tokio::time::sleep(delay).await;
    }
}

async fn prepare<V: Value>(px: &Arc<Paxos<V>>, slot: Slot, round: Round) -> PrepareOutcome<V> {
    let peers = px.peers();
    let majority = quorum(peers);
    let args = PrepareArgs {
        slot,
        round,
        sender: px.me(),
        done: px.own_done(),
    };

    let (tx, mut rx) = mpsc::channel::<Result<PrepareReply<V>, RpcError>>(peers);
    for to in 0..peers {
        if to == px.me() {
            let _ = tx.try_send(px.handle_prepare(&args));
            continue;
        }
        let tx = tx.clone();
        let args = args.clone();
        let transport = px.transport().clone();
        tokio::spawn(async move {
            let _ = tx.send(transport.prepare(to, args).await).await;
        });
    }
    drop(tx);

    let mut promises = 0;
    let mut failures = 0;
    let mut accepted: Option<(Round, V)> = None;
    let mut highest: Option<Round> = None;

    while let Some(reply) = rx.recv().await {
        match reply {
            Ok(reply) => {
                highest = highest.max(reply.promised);
                if reply.ok {
                    promises += 1;
                    let reported = reply.accepted.as_ref().map(|(n_a, _)| *n_a);
                    if reported > accepted.as_ref().map(|(n_a, _)| *n_a) {
                        accepted = reply.accepted;
                    }
                } else {
                    failures += 1;
                }
            }
            Err(e) => {
                trace!(slot, error = %e, "prepare failed");
                failures += 1;
            }
        }

        if promises >= majority {
            return PrepareOutcome::Promised { accepted };
        }
        if failures > peers - majority {
            break;
        }
    }

    PrepareOutcome::Rejected { highest }
}

async fn accept<V: Value>(px: &Arc<Paxos<V>>, slot: Slot, round: Round, value: V) -> AcceptOutcome {
    let peers = px.peers();
    let majority = quorum(peers);
    let args = AcceptArgs {
        slot,
        round,
        value,
        sender: px.me(),
        done: px.own_done(),
    };

    let (tx, mut rx) = mpsc::channel::<Result<AcceptReply, RpcError>>(peers);
    for to in 0..peers {
        if to == px.me() {
            let _ = tx.try_send(px.handle_accept(&args));
            continue;
        }
        let tx = tx.clone();
        let args = args.clone();
        let transport = px.transport().clone();
        tokio::spawn(async move {
            let _ = tx.send(transport.accept(to, args).await).await;
        });
    }
    drop(tx);

    let mut accepts = 0;
    let mut failures = 0;
    let mut highest: Option<Round> = None;

    while let Some(reply) = rx.recv().await {
        match reply {
            Ok(reply) if reply.ok => accepts += 1,
            Ok(reply) => {
                highest = highest.max(reply.promised);
                failures += 1;
            }
            Err(e) => {
                trace!(slot, error = %e, "accept failed");
                failures += 1;
            }
        }

        if accepts >= majority {
            return AcceptOutcome::Accepted;
        }
        if failures > peers - majority {
            break;
        }
    }

    AcceptOutcome::Rejected { highest }
}

fn decide<V: Value>(px: &Arc<Paxos<V>>, slot: Slot, round: Round, value: V) {
    let args = DecideArgs {
        slot,
        round,
        value,
        sender: px.me(),
        done: px.own_done(),
    };

    for to in 0..px.peers() {
        if to == px.me() {
            let _ = px.handle_decide(&args);
            continue;
        }
        tokio::spawn(deliver_decide(px.clone(), to, args.clone()));
    }
}

// Re-sent until the peer acknowledges, so a peer cut off while the slot was
// decided still learns it after the partition heals.
async fn deliver_decide<V: Value>(px: Arc<Paxos<V>>, to: PeerId, mut args: DecideArgs<V>) {
    let retry = px.retry().clone();
    let mut backoff = retry.iter();

    loop {
        if px.is_dead() || matches!(px.status(args.slot), Fate::Forgotten) {
            return;
        }
        args.done = px.own_done();
        match px.transport().decide(to, args.clone()).await {
            Ok(reply) if reply.ok => return,
            Ok(_) => trace!(slot = args.slot, to, "decide refused"),
            Err(e) => trace!(slot = args.slot, to, error = %e, "decide not delivered"),
        }
        backoff.sleep().await;
    }
}
