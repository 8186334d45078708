//! Relation resolver
//!
//! Multi-hop lookups across link tables, starting from one record id. Lookups
//! run over any [`TableSource`]: the full [`Snapshot`](crate::Snapshot) when
//! the active filter must be ignored, or a
//! [`FilteredView`](crate::FilteredView) when it must not.
//!
//! Targets of a gated kind (activations, events, clients, prizes, lucky
//! numbers, coin guesses, surveys, evaluations) are only returned when
//! published. Collections come back de-duplicated in table order; single
//! lookups follow the first link naming the source id.

use crate::analytics::grouping::Mean;
use crate::schema::{attr, EntityKind, LinkKind};
use crate::source::TableSource;
use crate::types::{EntityId, Record};
use serde::Serialize;
use std::collections::BTreeSet;

/// Decimals kept in activation-level mean ratings
const ACTIVATION_RATING_DECIMALS: u32 = 1;

/// A redemption together with its published prizes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RedemptionWithPrizes<'a> {
    #[serde(flatten)]
    pub redemption: &'a Record,
    pub prizes: Vec<&'a Record>,
}

/// A user and everything attached to them
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile<'a> {
    #[serde(flatten)]
    pub user: &'a Record,
    pub checkins: Vec<&'a Record>,
    pub redemptions: Vec<RedemptionWithPrizes<'a>>,
    pub lucky_numbers: Vec<&'a Record>,
    pub evaluations: Vec<&'a Record>,
    pub coin_guess: Option<&'a Record>,
    pub survey: Option<&'a Record>,
}

/// An activation with participation and rating figures
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivationStats<'a> {
    #[serde(flatten)]
    pub activation: &'a Record,
    /// Distinct users with a check-in at this activation
    pub total_users: usize,
    pub total_evaluations: usize,
    /// Mean of numeric ratings, 1 decimal, 0 without ratings
    pub mean_rating: f64,
    pub event: Option<&'a Record>,
    pub users: Vec<&'a Record>,
    pub evaluations: Vec<&'a Record>,
}

/// An event with its client and participation figures
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventStats<'a> {
    #[serde(flatten)]
    pub event: &'a Record,
    pub client: Option<&'a Record>,
    pub total_activations: usize,
    /// Check-in links naming any published activation of the event
    pub total_checkins: usize,
    /// Distinct users across all published activations of the event
    pub unique_users: usize,
    pub activations: Vec<&'a Record>,
}

/// Lookups over one table source
pub struct Relations<'s, S: TableSource + ?Sized> {
    source: &'s S,
}

impl<'s, S: TableSource + ?Sized> Clone for Relations<'s, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'s, S: TableSource + ?Sized> Copy for Relations<'s, S> {}

impl<'s, S: TableSource + ?Sized> Relations<'s, S> {
    pub fn new(source: &'s S) -> Self {
        Self { source }
    }

    /// Check-ins made by a user
    pub fn checkins_of_user(&self, user: EntityId) -> Vec<&'s Record> {
        let ids = self.neighbours(LinkKind::CheckinUser, EntityKind::Users, user);
        self.resolve(EntityKind::Checkins, ids)
    }

    /// Published activations a check-in was made at
    pub fn activations_of_checkin(&self, checkin: EntityId) -> Vec<&'s Record> {
        let ids = self.neighbours(LinkKind::CheckinActivation, EntityKind::Checkins, checkin);
        self.resolve(EntityKind::Activations, ids)
    }

    /// Distinct users with a check-in at an activation
    pub fn users_of_activation(&self, activation: EntityId) -> Vec<&'s Record> {
        let ids = self.user_ids_of_activation(activation);
        self.resolve(EntityKind::Users, ids)
    }

    /// Published activations of an event
    pub fn activations_of_event(&self, event: EntityId) -> Vec<&'s Record> {
        let ids = self.neighbours(LinkKind::ActivationEvent, EntityKind::Events, event);
        self.resolve(EntityKind::Activations, ids)
    }

    /// Published event an activation belongs to
    pub fn event_of_activation(&self, activation: EntityId) -> Option<&'s Record> {
        let ids = self.neighbours(LinkKind::ActivationEvent, EntityKind::Activations, activation);
        self.resolve_first(EntityKind::Events, ids)
    }

    /// Published client an event belongs to
    pub fn client_of_event(&self, event: EntityId) -> Option<&'s Record> {
        let ids = self.neighbours(LinkKind::EventClient, EntityKind::Events, event);
        self.resolve_first(EntityKind::Clients, ids)
    }

    /// Redemptions made by a user, each with its published prizes
    pub fn redemptions_of_user(&self, user: EntityId) -> Vec<RedemptionWithPrizes<'s>> {
        let ids = self.neighbours(LinkKind::RedemptionUser, EntityKind::Users, user);
        self.resolve(EntityKind::Redemptions, ids)
            .into_iter()
            .map(|redemption| {
                let prize_ids =
                    self.neighbours(LinkKind::RedemptionPrize, EntityKind::Redemptions, redemption.id);
                RedemptionWithPrizes {
                    redemption,
                    prizes: self.resolve(EntityKind::Prizes, prize_ids),
                }
            })
            .collect()
    }

    /// Distinct users who redeemed a prize
    pub fn users_of_prize(&self, prize: EntityId) -> Vec<&'s Record> {
        let redemptions = self.neighbours(LinkKind::RedemptionPrize, EntityKind::Prizes, prize);
        let users: Vec<EntityId> = redemptions
            .into_iter()
            .flat_map(|redemption| {
                self.neighbours(LinkKind::RedemptionUser, EntityKind::Redemptions, redemption)
            })
            .collect();
        self.resolve(EntityKind::Users, users)
    }

    /// Published evaluations of an activation
    pub fn evaluations_of_activation(&self, activation: EntityId) -> Vec<&'s Record> {
        let ids = self.neighbours(
            LinkKind::EvaluationActivation,
            EntityKind::Activations,
            activation,
        );
        self.resolve(EntityKind::Evaluations, ids)
    }

    /// Published evaluations written by a user
    pub fn evaluations_of_user(&self, user: EntityId) -> Vec<&'s Record> {
        let ids = self.neighbours(LinkKind::EvaluationUser, EntityKind::Users, user);
        self.resolve(EntityKind::Evaluations, ids)
    }

    /// Published lucky numbers of a user
    pub fn lucky_numbers_of_user(&self, user: EntityId) -> Vec<&'s Record> {
        let ids = self.neighbours(LinkKind::LuckyNumberUser, EntityKind::Users, user);
        self.resolve(EntityKind::LuckyNumbers, ids)
    }

    /// Published coin guess of a user
    pub fn coin_guess_of_user(&self, user: EntityId) -> Option<&'s Record> {
        let ids = self.neighbours(LinkKind::CoinGuessUser, EntityKind::Users, user);
        self.resolve_first(EntityKind::CoinGuesses, ids)
    }

    /// Published experience survey of a user
    pub fn survey_of_user(&self, user: EntityId) -> Option<&'s Record> {
        let ids = self.neighbours(LinkKind::SurveyUser, EntityKind::Users, user);
        self.resolve_first(EntityKind::ExperienceSurveys, ids)
    }

    /// A user merged with every per-user collection
    pub fn user_profile(&self, user: EntityId) -> Option<UserProfile<'s>> {
        let record = self.source.record(EntityKind::Users, user)?;
        Some(UserProfile {
            user: record,
            checkins: self.checkins_of_user(user),
            redemptions: self.redemptions_of_user(user),
            lucky_numbers: self.lucky_numbers_of_user(user),
            evaluations: self.evaluations_of_user(user),
            coin_guess: self.coin_guess_of_user(user),
            survey: self.survey_of_user(user),
        })
    }

    /// An activation merged with its participants, evaluations and event
    pub fn activation_stats(&self, activation: EntityId) -> Option<ActivationStats<'s>> {
        let record = self.source.record(EntityKind::Activations, activation)?;
        let users = self.users_of_activation(activation);
        let evaluations = self.evaluations_of_activation(activation);
        let mean: Mean = evaluations
            .iter()
            .filter_map(|evaluation| evaluation.number(attr::RATING))
            .collect();

        Some(ActivationStats {
            activation: record,
            total_users: users.len(),
            total_evaluations: evaluations.len(),
            mean_rating: mean.rounded(ACTIVATION_RATING_DECIMALS),
            event: self.event_of_activation(activation),
            users,
            evaluations,
        })
    }

    /// An event merged with its client and activation figures
    pub fn event_stats(&self, event: EntityId) -> Option<EventStats<'s>> {
        let record = self.source.record(EntityKind::Events, event)?;
        let activations = self.activations_of_event(event);

        let mut total_checkins = 0;
        let mut users = BTreeSet::new();
        for activation in &activations {
            total_checkins += self
                .neighbours(LinkKind::CheckinActivation, EntityKind::Activations, activation.id)
                .len();
            users.extend(
                self.users_of_activation(activation.id)
                    .into_iter()
                    .map(|user| user.id),
            );
        }

        Some(EventStats {
            event: record,
            client: self.client_of_event(event),
            total_activations: activations.len(),
            total_checkins,
            unique_users: users.len(),
            activations,
        })
    }

    /// User ids reachable from an activation through its check-ins
    fn user_ids_of_activation(&self, activation: EntityId) -> Vec<EntityId> {
        self.neighbours(LinkKind::CheckinActivation, EntityKind::Activations, activation)
            .into_iter()
            .flat_map(|checkin| self.neighbours(LinkKind::CheckinUser, EntityKind::Checkins, checkin))
            .collect()
    }

    /// Ids linked to `id` of kind `from` through `link`, in link order
    fn neighbours(&self, link: LinkKind, from: EntityKind, id: EntityId) -> Vec<EntityId> {
        match link.side_of(from) {
            Some(side) => self.source.linked_ids(link, side, id),
            None => Vec::new(),
        }
    }

    /// Visible, gate-passing records with these ids, in table order
    fn resolve(&self, kind: EntityKind, ids: Vec<EntityId>) -> Vec<&'s Record> {
        let mut positions: Vec<usize> = ids
            .into_iter()
            .filter_map(|id| self.source.position_of(kind, id))
            .collect();
        positions.sort_unstable();
        positions.dedup();

        positions
            .into_iter()
            .filter_map(|pos| self.source.record_at(kind, pos))
            .filter(|record| passes_gate(kind, record))
            .collect()
    }

    /// Record named by the first link only
    fn resolve_first(&self, kind: EntityKind, ids: Vec<EntityId>) -> Option<&'s Record> {
        let id = ids.first().copied()?;
        self.source
            .record(kind, id)
            .filter(|record| passes_gate(kind, record))
    }
}

/// The published gate: only gated kinds require a publication timestamp
pub fn passes_gate(kind: EntityKind, record: &Record) -> bool {
    !kind.is_gated() || record.is_published()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterState;
    use crate::snapshot::Snapshot;
    use crate::view::filter_view;
    use chrono::NaiveDate;
    use serde_json::json;

    const T: &str = "2025-01-01T00:00:00Z";

    fn snapshot() -> Snapshot {
        Snapshot::from_document(json!({
            "tables": {
                "up_users": { "data": [
                    {"id": 1, "tenho_conta": true},
                    {"id": 2, "tenho_conta": false},
                    {"id": 3, "tenho_conta": true}
                ]},
                "checkins": { "data": [ {"id": 10}, {"id": 11}, {"id": 12}, {"id": 13} ]},
                "checkins_users_permissions_user_lnk": { "data": [
                    {"checkin_id": 10, "user_id": 1},
                    {"checkin_id": 11, "user_id": 2},
                    {"checkin_id": 12, "user_id": 1},
                    {"checkin_id": 13, "user_id": 3}
                ]},
                "checkins_ativacao_lnk": { "data": [
                    {"checkin_id": 10, "ativacao_id": 5},
                    {"checkin_id": 11, "ativacao_id": 5},
                    {"checkin_id": 12, "ativacao_id": 5},
                    {"checkin_id": 13, "ativacao_id": 6}
                ]},
                "ativacoes": { "data": [
                    {"id": 5, "nome": "Photo booth", "published_at": T},
                    {"id": 6, "nome": "Quiz", "published_at": T},
                    {"id": 7, "nome": "Draft", "published_at": null}
                ]},
                "ativacoes_evento_lnk": { "data": [
                    {"ativacao_id": 5, "evento_id": 40},
                    {"ativacao_id": 6, "evento_id": 40},
                    {"ativacao_id": 7, "evento_id": 40}
                ]},
                "eventos": { "data": [ {"id": 40, "published_at": T} ]},
                "eventos_cliente_lnk": { "data": [
                    {"evento_id": 40, "cliente_id": 50},
                    {"evento_id": 40, "cliente_id": 51}
                ]},
                "clientes": { "data": [
                    {"id": 50},
                    {"id": 51, "published_at": T}
                ]},
                "resgates": { "data": [ {"id": 20}, {"id": 21} ]},
                "resgates_users_permissions_user_lnk": { "data": [
                    {"resgate_id": 20, "user_id": 1},
                    {"resgate_id": 21, "user_id": 3}
                ]},
                "resgates_brinde_lnk": { "data": [
                    {"resgate_id": 20, "brinde_id": 30},
                    {"resgate_id": 20, "brinde_id": 31},
                    {"resgate_id": 21, "brinde_id": 30}
                ]},
                "brindes": { "data": [
                    {"id": 30, "titulo": "Cap", "published_at": T},
                    {"id": 31, "titulo": "Mug"}
                ]},
                "avaliacao_de_ativacaos": { "data": [
                    {"id": 60, "avaliacao": 4, "published_at": T},
                    {"id": 61, "avaliacao": "5", "published_at": T},
                    {"id": 62, "avaliacao": 1},
                    {"id": 63, "avaliacao": "great", "published_at": T}
                ]},
                "avaliacao_de_ativacaos_ativacao_lnk": { "data": [
                    {"avaliacao_de_ativacao_id": 60, "ativacao_id": 5},
                    {"avaliacao_de_ativacao_id": 61, "ativacao_id": 5},
                    {"avaliacao_de_ativacao_id": 62, "ativacao_id": 5},
                    {"avaliacao_de_ativacao_id": 63, "ativacao_id": 5}
                ]},
                "avaliacao_de_ativacaos_users_permissions_user_lnk": { "data": [
                    {"avaliacao_de_ativacao_id": 61, "user_id": 1},
                    {"avaliacao_de_ativacao_id": 62, "user_id": 1}
                ]},
                "numero_da_sortes": { "data": [
                    {"id": 70, "published_at": T},
                    {"id": 71}
                ]},
                "numero_da_sortes_users_permissions_user_lnk": { "data": [
                    {"numero_da_sorte_id": 71, "user_id": 1},
                    {"numero_da_sorte_id": 70, "user_id": 1}
                ]},
                "chute_moedas": { "data": [ {"id": 80, "published_at": T} ]},
                "up_users_chute_moeda_lnk": { "data": [ {"user_id": 1, "chute_moedar_id": 80} ]},
                "pesquisa_experiencias": { "data": [ {"id": 90} ]},
                "pesquisa_experiencias_users_permissions_user_lnk": { "data": [
                    {"pesquisa_experiencias_id": 90, "user_id": 1}
                ]}
            }
        }))
        .unwrap()
    }

    fn ids(records: &[&Record]) -> Vec<EntityId> {
        records.iter().map(|r| r.id).collect()
    }

    #[test]
    fn test_simple_lookups() {
        let snapshot = snapshot();
        let relations = Relations::new(&snapshot);

        assert_eq!(ids(&relations.checkins_of_user(1)), vec![10, 12]);
        assert_eq!(ids(&relations.activations_of_checkin(13)), vec![6]);
        assert_eq!(ids(&relations.activations_of_event(40)), vec![5, 6]);
        assert_eq!(relations.event_of_activation(5).map(|r| r.id), Some(40));
        assert_eq!(ids(&relations.lucky_numbers_of_user(1)), vec![70]);
        assert_eq!(relations.coin_guess_of_user(1).map(|r| r.id), Some(80));
        assert!(relations.checkins_of_user(99).is_empty());
    }

    #[test]
    fn test_users_are_distinct() {
        let snapshot = snapshot();
        let relations = Relations::new(&snapshot);

        assert_eq!(ids(&relations.users_of_activation(5)), vec![1, 2]);
        assert_eq!(ids(&relations.users_of_prize(30)), vec![1, 3]);
    }

    #[test]
    fn test_single_lookup_follows_first_link() {
        let snapshot = snapshot();
        let relations = Relations::new(&snapshot);

        // First client link points at an unpublished client
        assert_eq!(relations.client_of_event(40), None);
        assert_eq!(relations.survey_of_user(1), None);
        assert_eq!(relations.event_of_activation(99), None);
    }

    #[test]
    fn test_redemptions_carry_published_prizes() {
        let snapshot = snapshot();
        let relations = Relations::new(&snapshot);

        let redemptions = relations.redemptions_of_user(1);
        assert_eq!(redemptions.len(), 1);
        assert_eq!(redemptions[0].redemption.id, 20);
        assert_eq!(ids(&redemptions[0].prizes), vec![30]);
    }

    #[test]
    fn test_gated_results_are_published() {
        let snapshot = snapshot();
        let relations = Relations::new(&snapshot);

        let gated = [
            relations.evaluations_of_activation(5),
            relations.evaluations_of_user(1),
            relations.activations_of_event(40),
            relations.lucky_numbers_of_user(1),
        ];
        for records in gated {
            assert!(records.iter().all(|r| r.is_published()));
        }
    }

    #[test]
    fn test_activation_stats() {
        let snapshot = snapshot();
        let stats = Relations::new(&snapshot).activation_stats(5).unwrap();

        assert_eq!(stats.total_users, 2);
        // 60, 61 and 63 are published; 63 has no numeric rating
        assert_eq!(stats.total_evaluations, 3);
        assert_eq!(stats.mean_rating, 4.5);
        assert_eq!(stats.event.map(|r| r.id), Some(40));

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["nome"], "Photo booth");
        assert_eq!(json["total_users"], 2);
    }

    #[test]
    fn test_activation_stats_mean_rounds_to_one_decimal() {
        let snapshot = Snapshot::from_document(json!({
            "tables": {
                "ativacoes": { "data": [ {"id": 5, "published_at": T} ]},
                "avaliacao_de_ativacaos": { "data": [
                    {"id": 70, "avaliacao": 4, "published_at": T},
                    {"id": 71, "avaliacao": 5, "published_at": T},
                    {"id": 72, "avaliacao": "5", "published_at": T}
                ]},
                "avaliacao_de_ativacaos_ativacao_lnk": { "data": [
                    {"avaliacao_de_ativacao_id": 70, "ativacao_id": 5},
                    {"avaliacao_de_ativacao_id": 71, "ativacao_id": 5},
                    {"avaliacao_de_ativacao_id": 72, "ativacao_id": 5}
                ]}
            }
        }))
        .unwrap();

        let stats = Relations::new(&snapshot).activation_stats(5).unwrap();
        assert_eq!(stats.total_evaluations, 3);
        assert_eq!(stats.mean_rating, 4.7);
    }

    #[test]
    fn test_activation_stats_root_is_not_gated() {
        let snapshot = snapshot();
        let relations = Relations::new(&snapshot);

        let stats = relations.activation_stats(7).unwrap();
        assert_eq!(stats.total_users, 0);
        assert_eq!(stats.mean_rating, 0.0);
        assert!(relations.activation_stats(99).is_none());
    }

    #[test]
    fn test_event_stats() {
        let snapshot = snapshot();
        let stats = Relations::new(&snapshot).event_stats(40).unwrap();

        assert_eq!(stats.total_activations, 2);
        assert_eq!(stats.total_checkins, 4);
        assert_eq!(stats.unique_users, 3);
        assert_eq!(stats.client, None);
    }

    #[test]
    fn test_user_profile() {
        let snapshot = snapshot();
        let profile = Relations::new(&snapshot).user_profile(1).unwrap();

        assert_eq!(ids(&profile.checkins), vec![10, 12]);
        assert_eq!(ids(&profile.evaluations), vec![61]);
        assert_eq!(profile.redemptions.len(), 1);
        assert_eq!(profile.coin_guess.map(|r| r.id), Some(80));
        assert_eq!(profile.survey, None);

        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["tenho_conta"], true);
        assert_eq!(json["redemptions"][0]["prizes"][0]["titulo"], "Cap");
    }

    #[test]
    fn test_lookups_over_filtered_view() {
        let snapshot = snapshot();
        let filter = FilterState::new().with_has_account(Some(true));
        let as_of = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let view = filter_view(&snapshot, &filter, as_of);
        let relations = Relations::new(&view);

        assert_eq!(ids(&relations.users_of_activation(5)), vec![1]);
        assert!(relations.user_profile(2).is_none());
        // Unfiltered lookups still see everyone
        assert_eq!(ids(&Relations::new(&snapshot).users_of_activation(5)), vec![1, 2]);
    }

    #[test]
    fn test_user_collections_narrow_over_filtered_view() {
        let snapshot = snapshot();
        let filter = FilterState::new().with_has_account(Some(false));
        let as_of = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let view = filter_view(&snapshot, &filter, as_of);
        let relations = Relations::new(&view);

        assert!(relations.lucky_numbers_of_user(1).is_empty());
        assert!(relations.evaluations_of_user(1).is_empty());
        assert!(relations.coin_guess_of_user(1).is_none());
        assert_eq!(ids(&Relations::new(&snapshot).lucky_numbers_of_user(1)), vec![70]);
    }
}
