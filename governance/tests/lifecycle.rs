mod common;

use common::*;
use concord_governance::{
    AuditLog, ExecutionOutcome, GovernanceError, GovernanceEvent, ProposalFilter,
    ProposalRegistry, RejectionReason, TallyDecision, VoteOption, VotingEngine,
};
use concord_types::{ProposalKind, ProposalState, Timestamp};
use std::sync::Arc;

#[test]
fn weighted_majority_with_quorum_passes_and_starts_execution() {
    let w = World::new();
    let p = w.registry.create_proposal(request(), Timestamp::new(T0)).unwrap();
    assert_eq!(p.state, ProposalState::UnderReview);

    let ctx = w.ctx();
    let out = w.registry.advance(&p.id, Timestamp::new(VOTING_OPEN), &ctx).unwrap();
    assert_eq!(out.final_state(), Some(ProposalState::Voting));

    w.vote(p.id, "alice", VoteOption::For, VOTING_OPEN + 10).unwrap();
    w.vote(p.id, "bob", VoteOption::Against, VOTING_OPEN + 20).unwrap();
    w.vote(p.id, "carol", VoteOption::Abstain, VOTING_OPEN + 30).unwrap();

    let out = w.registry.advance(&p.id, Timestamp::new(VOTING_CLOSE), &ctx).unwrap();
    let states: Vec<_> = out.transitions.iter().map(|t| t.to).collect();
    assert_eq!(states, vec![ProposalState::Passed, ProposalState::Executing]);

    let tally = out.tally.unwrap();
    assert_eq!(tally.participation_bps, 4500);
    assert_eq!((tally.for_weight, tally.against_weight, tally.abstain_weight), (3000, 1000, 500));

    let stored = w.registry.get(&p.id).unwrap();
    assert_eq!(stored.state, ProposalState::Executing);
    assert!(stored.tally.unwrap().passed());
}

#[test]
fn unanimous_minority_participation_is_rejected() {
    let w = World::new();
    let p = w.registry.create_proposal(request(), Timestamp::new(T0)).unwrap();
    let ctx = w.ctx();
    w.registry.advance(&p.id, Timestamp::new(VOTING_OPEN), &ctx).unwrap();
    w.vote(p.id, "alice", VoteOption::For, VOTING_OPEN + 1).unwrap();

    let out = w.registry.advance(&p.id, Timestamp::new(VOTING_CLOSE), &ctx).unwrap();
    assert_eq!(out.final_state(), Some(ProposalState::Rejected));
    assert!(matches!(
        out.tally.unwrap().decision,
        TallyDecision::Rejected(RejectionReason::QuorumNotMet { participation_bps: 3000, .. })
    ));
}

#[test]
fn all_steps_happen_in_one_late_advance() {
    let w = World::new();
    let p = w.registry.create_proposal(request(), Timestamp::new(T0)).unwrap();
    let ctx = w.ctx();
    let out = w
        .registry
        .advance(&p.id, Timestamp::new(VOTING_CLOSE + DAY), &ctx)
        .unwrap();
    let states: Vec<_> = out.transitions.iter().map(|t| t.to).collect();
    assert_eq!(states, vec![ProposalState::Voting, ProposalState::Rejected]);
}

#[test]
fn vote_during_review_is_closed() {
    let w = World::new();
    let p = w.registry.create_proposal(request(), Timestamp::new(T0)).unwrap();
    let err = w.vote(p.id, "alice", VoteOption::For, T0 + 10).unwrap_err();
    assert!(matches!(err, GovernanceError::VotingClosed(_)));
}

#[test]
fn vote_after_period_end_but_before_advance_is_closed() {
    let w = World::new();
    let p = w.registry.create_proposal(request(), Timestamp::new(T0)).unwrap();
    w.registry.advance(&p.id, Timestamp::new(VOTING_OPEN), &w.ctx()).unwrap();
    let err = w.vote(p.id, "alice", VoteOption::For, VOTING_CLOSE).unwrap_err();
    assert!(matches!(err, GovernanceError::VotingClosed(_)));
}

#[test]
fn repeated_vote_replaces_the_earlier_one() {
    let w = World::new();
    let p = w.registry.create_proposal(request(), Timestamp::new(T0)).unwrap();
    let ctx = w.ctx();
    w.registry.advance(&p.id, Timestamp::new(VOTING_OPEN), &ctx).unwrap();

    let first = w.vote(p.id, "dave", VoteOption::Against, VOTING_OPEN + 1).unwrap();
    assert_eq!(first.replaced, None);
    let second = w.vote(p.id, "dave", VoteOption::For, VOTING_OPEN + 2).unwrap();
    assert_eq!(second.replaced, Some(VoteOption::Against));
    assert_eq!(second.snapshot.voters(), 1);
    assert_eq!(second.snapshot.for_votes, 1);
    assert!(second.sequence > first.sequence);

    let out = w.registry.advance(&p.id, Timestamp::new(VOTING_CLOSE), &ctx).unwrap();
    let tally = out.tally.unwrap();
    assert_eq!(tally.votes_counted, 1);
    assert_eq!(tally.for_weight, 5500);
    assert_eq!(tally.against_weight, 0);
}

#[test]
fn outsiders_and_bad_signatures_are_unauthorized() {
    let w = World::new();
    let p = w.registry.create_proposal(request(), Timestamp::new(T0)).unwrap();
    w.registry.advance(&p.id, Timestamp::new(VOTING_OPEN), &w.ctx()).unwrap();

    let err = w.vote(p.id, "mallory", VoteOption::For, VOTING_OPEN + 1).unwrap_err();
    assert!(matches!(err, GovernanceError::Unauthorized(_)));

    let err = w
        .voting
        .submit_vote(
            &w.registry,
            concord_governance::VoteRequest {
                proposal_id: p.id,
                voter: id("bob"),
                option: VoteOption::For,
                signature: Vec::new(),
                nonce: 1,
            },
            Timestamp::new(VOTING_OPEN + 1),
        )
        .unwrap_err();
    assert!(matches!(err, GovernanceError::Unauthorized(_)));
    assert!(w.voting.votes(&p.id).unwrap().is_empty());
}

#[test]
fn resubmitted_signed_vote_cannot_override_a_newer_choice() {
    use concord_governance::{vote_payload, Ed25519Verifier, VoteRequest};
    use ed25519_dalek::{Signer, SigningKey};

    let w = World::new();
    let key = SigningKey::from_bytes(&[9; 32]);
    let voter = concord_types::Identity::new(hex::encode(key.verifying_key().to_bytes()));
    let mut req = request();
    req.stakeholders.as_mut().unwrap().insert(voter.clone());
    let p = w.registry.create_proposal(req, Timestamp::new(T0)).unwrap();
    w.registry.advance(&p.id, Timestamp::new(VOTING_OPEN), &w.ctx()).unwrap();

    let voting = VotingEngine::new(
        Arc::clone(&w.params),
        Arc::clone(&w.stake),
        Arc::new(Ed25519Verifier),
        w.store.clone(),
        Arc::clone(&w.events),
    );
    let signed = |option: VoteOption, nonce: u64| VoteRequest {
        proposal_id: p.id,
        voter: voter.clone(),
        option,
        signature: key.sign(&vote_payload(&p.id, option, nonce)).to_bytes().to_vec(),
        nonce,
    };

    let first = signed(VoteOption::For, 1);
    voting.submit_vote(&w.registry, first.clone(), Timestamp::new(VOTING_OPEN + 1)).unwrap();
    voting
        .submit_vote(&w.registry, signed(VoteOption::Against, 2), Timestamp::new(VOTING_OPEN + 2))
        .unwrap();

    let err = voting
        .submit_vote(&w.registry, first, Timestamp::new(VOTING_OPEN + 3))
        .unwrap_err();
    assert!(matches!(err, GovernanceError::Unauthorized(_)));
    let current = voting.vote_of(&p.id, &voter).unwrap().unwrap();
    assert_eq!(current.option, VoteOption::Against);
    assert_eq!(current.nonce, 2);

    // A signature over one nonce does not carry over to a higher one.
    let mut forged = signed(VoteOption::For, 1);
    forged.nonce = 3;
    let err = voting
        .submit_vote(&w.registry, forged, Timestamp::new(VOTING_OPEN + 4))
        .unwrap_err();
    assert!(matches!(err, GovernanceError::Unauthorized(_)));
    assert_eq!(voting.running_snapshot(&p.id).unwrap().against_votes, 1);
}

#[test]
fn open_membership_accepts_anyone() {
    let w = World::new();
    let mut req = request();
    req.open_membership = true;
    let p = w.registry.create_proposal(req, Timestamp::new(T0)).unwrap();
    w.registry.advance(&p.id, Timestamp::new(VOTING_OPEN), &w.ctx()).unwrap();
    assert!(w.vote(p.id, "mallory", VoteOption::For, VOTING_OPEN + 1).is_ok());
}

#[test]
fn withdraw_rules() {
    let w = World::new();
    let p = w.registry.create_proposal(request(), Timestamp::new(T0)).unwrap();
    let err = w.registry.withdraw(&p.id, &id("bob"), Timestamp::new(T0 + 1)).unwrap_err();
    assert!(matches!(err, GovernanceError::Unauthorized(_)));

    let withdrawn = w.registry.withdraw(&p.id, &id("alice"), Timestamp::new(T0 + 1)).unwrap();
    assert_eq!(withdrawn.state, ProposalState::Withdrawn);
    let again = w.registry.withdraw(&p.id, &id("alice"), Timestamp::new(T0 + 2)).unwrap_err();
    assert!(matches!(again, GovernanceError::InvalidState { .. }));

    // Nothing moves a withdrawn proposal.
    let out = w.registry.advance(&p.id, Timestamp::new(VOTING_CLOSE * 2), &w.ctx()).unwrap();
    assert!(out.is_noop());
}

#[test]
fn tallied_proposal_cannot_be_withdrawn() {
    let w = World::new();
    let p = w.registry.create_proposal(request(), Timestamp::new(T0)).unwrap();
    let ctx = w.ctx();
    w.registry.advance(&p.id, Timestamp::new(VOTING_OPEN), &ctx).unwrap();
    w.vote(p.id, "dave", VoteOption::For, VOTING_OPEN + 1).unwrap();
    w.registry.advance(&p.id, Timestamp::new(VOTING_CLOSE), &ctx).unwrap();

    let err = w.registry.withdraw(&p.id, &id("alice"), Timestamp::new(VOTING_CLOSE + 1)).unwrap_err();
    assert!(matches!(
        err,
        GovernanceError::InvalidState { state: ProposalState::Executing, .. }
    ));
}

#[test]
fn incomplete_or_cyclic_requests_fail_validation() {
    let w = World::new();

    let mut no_title = request();
    no_title.title = None;
    assert!(matches!(
        w.registry.create_proposal(no_title, Timestamp::new(T0)),
        Err(GovernanceError::Validation(_))
    ));

    let mut blank = request();
    blank.description = Some("   ".into());
    assert!(matches!(
        w.registry.create_proposal(blank, Timestamp::new(T0)),
        Err(GovernanceError::Validation(_))
    ));

    let mut cyclic = request();
    cyclic.execution_plan = Some(concord_governance::ExecutionPlan::new(vec![
        phase("a", &["b"]),
        phase("b", &["a"]),
    ]));
    assert!(matches!(
        w.registry.create_proposal(cyclic, Timestamp::new(T0)),
        Err(GovernanceError::Validation(_))
    ));

    let mut no_stakeholders = request();
    no_stakeholders.stakeholders = Some(Default::default());
    assert!(matches!(
        w.registry.create_proposal(no_stakeholders, Timestamp::new(T0)),
        Err(GovernanceError::Validation(_))
    ));

    let mut zero_days = request();
    zero_days.timeline.as_mut().unwrap().voting_period_days = 0;
    assert!(matches!(
        w.registry.create_proposal(zero_days, Timestamp::new(T0)),
        Err(GovernanceError::Validation(_))
    ));
    assert!(w.registry.is_empty());
}

#[test]
fn draft_waits_for_the_proposer() {
    let w = World::new();
    let mut req = request();
    req.draft = true;
    let p = w.registry.create_proposal(req, Timestamp::new(T0)).unwrap();
    assert_eq!(p.state, ProposalState::Draft);
    assert!(p.submitted_at.is_none());

    let out = w.registry.advance(&p.id, Timestamp::new(T0 + 10 * DAY), &w.ctx()).unwrap();
    assert!(out.is_noop());

    let err = w.registry.submit(&p.id, &id("bob"), Timestamp::new(T0 + 10 * DAY)).unwrap_err();
    assert!(matches!(err, GovernanceError::Unauthorized(_)));

    let submitted = w
        .registry
        .submit(&p.id, &id("alice"), Timestamp::new(T0 + 10 * DAY))
        .unwrap();
    assert_eq!(submitted.state, ProposalState::UnderReview);
    assert_eq!(submitted.periods.review.opens_at, Timestamp::new(T0 + 10 * DAY));

    let err = w
        .registry
        .submit(&p.id, &id("alice"), Timestamp::new(T0 + 10 * DAY))
        .unwrap_err();
    assert!(matches!(err, GovernanceError::InvalidState { .. }));
}

#[test]
fn minimum_proposer_stake_is_enforced() {
    let mut w = World::new();
    let params = Arc::new(concord_types::GovernanceParams {
        min_proposer_stake: 2000,
        ..(*w.params).clone()
    });
    w.registry = ProposalRegistry::new(params, Arc::clone(&w.stake), w.store.clone(), Arc::clone(&w.events));

    let mut req = request();
    req.proposer = Some(id("carol"));
    assert!(matches!(
        w.registry.create_proposal(req, Timestamp::new(T0)),
        Err(GovernanceError::Unauthorized(_))
    ));
    assert!(w.registry.create_proposal(request(), Timestamp::new(T0)).is_ok());
}

#[test]
fn tally_error_keeps_voting_and_retries() {
    let w = World::new();
    let p = w.registry.create_proposal(request(), Timestamp::new(T0)).unwrap();
    let mut ctx = w.ctx();
    ctx.fail_tally = true;

    let err = w
        .registry
        .advance(&p.id, Timestamp::new(VOTING_CLOSE), &ctx)
        .unwrap_err();
    assert!(matches!(err, GovernanceError::Tally(_)));
    // The review → voting step from the same call is kept.
    assert_eq!(w.registry.get(&p.id).unwrap().state, ProposalState::Voting);

    ctx.fail_tally = false;
    let out = w.registry.advance(&p.id, Timestamp::new(VOTING_CLOSE + 60), &ctx).unwrap();
    assert_eq!(out.final_state(), Some(ProposalState::Rejected));
}

#[test]
fn execution_report_finishes_the_proposal() {
    let w = World::new();
    let ok = w.registry.create_proposal(request(), Timestamp::new(T0)).unwrap();
    let bad = w.registry.create_proposal(request(), Timestamp::new(T0)).unwrap();
    assert_ne!(ok.id, bad.id);

    let mut ctx = w.ctx();
    for p in [&ok, &bad] {
        w.registry.advance(&p.id, Timestamp::new(VOTING_OPEN), &ctx).unwrap();
        w.vote(p.id, "dave", VoteOption::For, VOTING_OPEN + 1).unwrap();
        w.registry.advance(&p.id, Timestamp::new(VOTING_CLOSE), &ctx).unwrap();
    }

    let out = w.registry.advance(&ok.id, Timestamp::new(VOTING_CLOSE + 1), &ctx).unwrap();
    assert!(out.is_noop());
    assert_eq!(w.registry.due(Timestamp::new(VOTING_CLOSE + 1)).len(), 2);

    ctx.outcomes.insert(ok.id, ExecutionOutcome::Completed);
    ctx.outcomes.insert(bad.id, ExecutionOutcome::Failed("phase a blocked".into()));
    w.registry.advance(&ok.id, Timestamp::new(VOTING_CLOSE + 2), &ctx).unwrap();
    w.registry.advance(&bad.id, Timestamp::new(VOTING_CLOSE + 2), &ctx).unwrap();

    assert_eq!(w.registry.get(&ok.id).unwrap().state, ProposalState::Completed);
    let failed = w.registry.get(&bad.id).unwrap();
    assert_eq!(failed.state, ProposalState::Failed);
    assert_eq!(failed.failure_reason.as_deref(), Some("phase a blocked"));
    assert!(w.registry.due(Timestamp::new(u64::MAX)).is_empty());
}

#[test]
fn advance_is_idempotent() {
    let w = World::new();
    let p = w.registry.create_proposal(request(), Timestamp::new(T0)).unwrap();
    let ctx = w.ctx();
    assert!(w.registry.advance(&p.id, Timestamp::new(T0 + 5), &ctx).unwrap().is_noop());
    assert!(!w.registry.advance(&p.id, Timestamp::new(VOTING_OPEN), &ctx).unwrap().is_noop());
    assert!(w.registry.advance(&p.id, Timestamp::new(VOTING_OPEN), &ctx).unwrap().is_noop());
}

#[test]
fn state_survives_reload() {
    let w = World::new();
    let p = w.registry.create_proposal(request(), Timestamp::new(T0)).unwrap();
    w.registry.advance(&p.id, Timestamp::new(VOTING_OPEN), &w.ctx()).unwrap();
    w.vote(p.id, "alice", VoteOption::For, VOTING_OPEN + 1).unwrap();
    w.vote(p.id, "bob", VoteOption::Against, VOTING_OPEN + 2).unwrap();

    let registry = ProposalRegistry::load(
        Arc::clone(&w.params),
        Arc::clone(&w.stake),
        w.store.clone(),
        Arc::clone(&w.events),
    )
    .unwrap();
    let voting = VotingEngine::new(
        Arc::clone(&w.params),
        Arc::clone(&w.stake),
        Arc::new(AnySignature),
        w.store.clone(),
        Arc::clone(&w.events),
    );
    assert_eq!(registry.get(&p.id).unwrap().state, ProposalState::Voting);
    assert_eq!(registry.list_by_state(ProposalState::Voting).unwrap(), vec![p.id]);
    assert_eq!(voting.running_snapshot(&p.id).unwrap().voters(), 2);

    let ack = voting
        .submit_vote(
            &registry,
            concord_governance::VoteRequest {
                proposal_id: p.id,
                voter: id("bob"),
                option: VoteOption::For,
                signature: vec![1],
                nonce: VOTING_OPEN + 3,
            },
            Timestamp::new(VOTING_OPEN + 3),
        )
        .unwrap();
    assert_eq!(ack.replaced, Some(VoteOption::Against));
    assert_eq!(ack.sequence, 2);
}

#[test]
fn query_filters_and_paginates() {
    let w = World::new();
    for i in 0..5u64 {
        let mut req = request();
        if i % 2 == 0 {
            req.kind = Some(ProposalKind::Strategic);
        }
        w.registry.create_proposal(req, Timestamp::new(T0 + i)).unwrap();
    }

    let strategic = w.registry.query(&ProposalFilter {
        kind: Some(ProposalKind::Strategic),
        ..ProposalFilter::default()
    });
    assert_eq!(strategic.total, 3);
    assert!(strategic.items.windows(2).all(|p| p[0].created_at >= p[1].created_at));

    let page = w.registry.query(&ProposalFilter {
        offset: 1,
        limit: Some(2),
        ..ProposalFilter::default()
    });
    assert_eq!(page.total, 5);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].created_at, Timestamp::new(T0 + 3));

    let none = w.registry.query(&ProposalFilter {
        proposer: Some(id("nobody")),
        ..ProposalFilter::default()
    });
    assert_eq!(none.total, 0);
}

#[test]
fn audit_log_sees_the_whole_story() {
    let w = World::new();
    let log = AuditLog::attach(&w.events, 100);
    let p = w.registry.create_proposal(request(), Timestamp::new(T0)).unwrap();
    let ctx = w.ctx();
    w.registry.advance(&p.id, Timestamp::new(VOTING_OPEN), &ctx).unwrap();
    w.vote(p.id, "dave", VoteOption::For, VOTING_OPEN + 1).unwrap();
    w.registry.advance(&p.id, Timestamp::new(VOTING_CLOSE), &ctx).unwrap();

    let events = log.for_proposal(&p.id);
    assert!(matches!(events.first(), Some(GovernanceEvent::ProposalCreated { .. })));
    assert!(events.iter().any(|e| matches!(e, GovernanceEvent::VoteCast { .. })));
    assert!(events.iter().any(|e| matches!(e, GovernanceEvent::Tallied { passed: true, .. })));
    assert!(matches!(
        events.last(),
        Some(GovernanceEvent::StateChanged { to: ProposalState::Executing, .. })
    ));
}

#[test]
fn tally_uses_stake_at_close_and_is_frozen_afterwards() {
    use concord_stake::Stakeholder;

    let w = World::new();
    let p = w.registry.create_proposal(request(), Timestamp::new(T0)).unwrap();
    let ctx = w.ctx();
    w.registry.advance(&p.id, Timestamp::new(VOTING_OPEN), &ctx).unwrap();
    w.vote(p.id, "alice", VoteOption::For, VOTING_OPEN + 1).unwrap();
    w.vote(p.id, "bob", VoteOption::Against, VOTING_OPEN + 2).unwrap();

    // Bob's stake grows past alice's while voting is still open.
    let restake = |alice: u128, bob: u128, at: u64| {
        w.stake
            .apply_snapshot(
                &community(),
                vec![
                    Stakeholder::new(id("alice"), alice, 0.9, Timestamp::new(at)),
                    Stakeholder::new(id("bob"), bob, 0.7, Timestamp::new(at)),
                    Stakeholder::new(id("carol"), 500, 0.5, Timestamp::new(at)),
                    Stakeholder::new(id("dave"), 5500, 0.5, Timestamp::new(at)),
                ],
                Timestamp::new(at),
            )
            .unwrap();
    };
    restake(3000, 4000, VOTING_OPEN + 100);

    let out = w.registry.advance(&p.id, Timestamp::new(VOTING_CLOSE), &ctx).unwrap();
    let tally = out.tally.unwrap();
    assert_eq!((tally.for_weight, tally.against_weight), (3000, 4000));
    assert_eq!(tally.total_stake, 13_000);
    assert_eq!(tally.decision, TallyDecision::Rejected(RejectionReason::NoMajority));

    restake(9000, 10, VOTING_CLOSE + 100);
    let stored = w.registry.get(&p.id).unwrap();
    assert_eq!(stored.state, ProposalState::Rejected);
    assert_eq!(stored.tally, Some(tally));
    assert!(w.registry.advance(&p.id, Timestamp::new(VOTING_CLOSE + 200), &ctx).unwrap().is_noop());
}

#[test]
fn tally_is_announced_only_once_it_is_stored() {
    let w = World::new();
    let log = AuditLog::attach(&w.events, 100);
    let p = w.registry.create_proposal(request(), Timestamp::new(T0)).unwrap();
    let ctx = w.ctx();
    w.registry.advance(&p.id, Timestamp::new(VOTING_OPEN), &ctx).unwrap();
    w.vote(p.id, "dave", VoteOption::For, VOTING_OPEN + 1).unwrap();

    let tallied = |log: &AuditLog| {
        log.for_proposal(&p.id)
            .iter()
            .filter(|e| matches!(e, GovernanceEvent::Tallied { .. }))
            .count()
    };

    w.store.fail_proposal_writes(true);
    let err = w.registry.advance(&p.id, Timestamp::new(VOTING_CLOSE), &ctx).unwrap_err();
    assert!(matches!(err, GovernanceError::Store(_)));
    assert_eq!(tallied(&log), 0);
    assert_eq!(w.registry.get(&p.id).unwrap().state, ProposalState::Voting);

    w.store.fail_proposal_writes(false);
    let out = w.registry.advance(&p.id, Timestamp::new(VOTING_CLOSE), &ctx).unwrap();
    assert_eq!(out.final_state(), Some(ProposalState::Executing));
    assert_eq!(tallied(&log), 1);

    let events = log.for_proposal(&p.id);
    let tally_at = events
        .iter()
        .position(|e| matches!(e, GovernanceEvent::Tallied { .. }))
        .unwrap();
    assert!(matches!(
        events[tally_at + 1],
        GovernanceEvent::StateChanged { from: ProposalState::Voting, .. }
    ));
}

#[test]
fn settled_proposals_leave_the_active_community_set() {
    let w = World::new();
    assert!(w.registry.active_communities().is_empty());

    let first = w.registry.create_proposal(request(), Timestamp::new(T0)).unwrap();
    let second = w.registry.create_proposal(request(), Timestamp::new(T0 + 1)).unwrap();
    assert_eq!(w.registry.active_communities().into_iter().collect::<Vec<_>>(), vec![community()]);

    w.registry.withdraw(&first.id, &id("alice"), Timestamp::new(T0 + 2)).unwrap();
    assert_eq!(w.registry.active_communities().len(), 1);

    w.registry.withdraw(&second.id, &id("alice"), Timestamp::new(T0 + 3)).unwrap();
    assert!(w.registry.active_communities().is_empty());
}
