//! Fixed schema of the participation snapshot
//!
//! Names every entity table and link table the loader document can carry,
//! which entity kinds sit behind the published gate, and the foreign-key
//! columns of each link table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Well-known attribute names
pub mod attr {
    pub const PUBLISHED_AT: &str = "published_at";
    pub const CREATED_AT: &str = "created_at";
    pub const HAS_ACCOUNT: &str = "tenho_conta";
    pub const BIRTH_DATE: &str = "data_usuario";
    pub const RATING: &str = "avaliacao";

    // Activation display fields
    pub const NAME: &str = "nome";
    pub const KIND: &str = "tipo";
    pub const LOCATION: &str = "local";
    pub const SCORE: &str = "pontuacao";

    // Prize display fields
    pub const TITLE: &str = "titulo";
    pub const POINTS: &str = "pontos";
    pub const STOCK: &str = "estoque";
}

/// Entity table kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Users,
    Checkins,
    Activations,
    Events,
    Clients,
    Redemptions,
    Prizes,
    LuckyNumbers,
    CoinGuesses,
    ExperienceSurveys,
    Evaluations,
}

impl EntityKind {
    /// Every entity kind, in schema order
    pub const ALL: [EntityKind; 11] = [
        EntityKind::Users,
        EntityKind::Checkins,
        EntityKind::Activations,
        EntityKind::Events,
        EntityKind::Clients,
        EntityKind::Redemptions,
        EntityKind::Prizes,
        EntityKind::LuckyNumbers,
        EntityKind::CoinGuesses,
        EntityKind::ExperienceSurveys,
        EntityKind::Evaluations,
    ];

    /// Table name used in the loader document
    pub fn table_name(self) -> &'static str {
        match self {
            EntityKind::Users => "up_users",
            EntityKind::Checkins => "checkins",
            EntityKind::Activations => "ativacoes",
            EntityKind::Events => "eventos",
            EntityKind::Clients => "clientes",
            EntityKind::Redemptions => "resgates",
            EntityKind::Prizes => "brindes",
            EntityKind::LuckyNumbers => "numero_da_sortes",
            EntityKind::CoinGuesses => "chute_moedas",
            EntityKind::ExperienceSurveys => "pesquisa_experiencias",
            EntityKind::Evaluations => "avaliacao_de_ativacaos",
        }
    }

    /// Look up an entity kind by its document table name
    pub fn from_table_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.table_name() == name)
    }

    /// True if records of this kind are hidden unless published
    pub fn is_gated(self) -> bool {
        !matches!(
            self,
            EntityKind::Users | EntityKind::Checkins | EntityKind::Redemptions
        )
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.table_name())
    }
}

/// Link (many-to-many association) table kinds
///
/// Every link record holds exactly two foreign keys: the `left` entity and the
/// `right` entity, in the column order the document uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LinkKind {
    CheckinUser,
    CheckinActivation,
    ActivationEvent,
    EventClient,
    RedemptionUser,
    RedemptionPrize,
    EvaluationActivation,
    EvaluationUser,
    LuckyNumberUser,
    CoinGuessUser,
    SurveyUser,
}

/// One side of a link table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkEnd {
    /// Entity kind the foreign key points into
    pub kind: EntityKind,
    /// Foreign-key column name in the document
    pub column: &'static str,
}

/// Which side of a link a lookup starts from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

impl LinkKind {
    /// Every link kind, in schema order
    pub const ALL: [LinkKind; 11] = [
        LinkKind::CheckinUser,
        LinkKind::CheckinActivation,
        LinkKind::ActivationEvent,
        LinkKind::EventClient,
        LinkKind::RedemptionUser,
        LinkKind::RedemptionPrize,
        LinkKind::EvaluationActivation,
        LinkKind::EvaluationUser,
        LinkKind::LuckyNumberUser,
        LinkKind::CoinGuessUser,
        LinkKind::SurveyUser,
    ];

    /// Table name used in the loader document
    pub fn table_name(self) -> &'static str {
        match self {
            LinkKind::CheckinUser => "checkins_users_permissions_user_lnk",
            LinkKind::CheckinActivation => "checkins_ativacao_lnk",
            LinkKind::ActivationEvent => "ativacoes_evento_lnk",
            LinkKind::EventClient => "eventos_cliente_lnk",
            LinkKind::RedemptionUser => "resgates_users_permissions_user_lnk",
            LinkKind::RedemptionPrize => "resgates_brinde_lnk",
            LinkKind::EvaluationActivation => "avaliacao_de_ativacaos_ativacao_lnk",
            LinkKind::EvaluationUser => "avaliacao_de_ativacaos_users_permissions_user_lnk",
            LinkKind::LuckyNumberUser => "numero_da_sortes_users_permissions_user_lnk",
            LinkKind::CoinGuessUser => "up_users_chute_moeda_lnk",
            LinkKind::SurveyUser => "pesquisa_experiencias_users_permissions_user_lnk",
        }
    }

    /// Look up a link kind by its document table name
    pub fn from_table_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.table_name() == name)
    }

    /// Left foreign key
    pub fn left(self) -> LinkEnd {
        use EntityKind::*;
        let (kind, column) = match self {
            LinkKind::CheckinUser | LinkKind::CheckinActivation => (Checkins, "checkin_id"),
            LinkKind::ActivationEvent => (Activations, "ativacao_id"),
            LinkKind::EventClient => (Events, "evento_id"),
            LinkKind::RedemptionUser | LinkKind::RedemptionPrize => (Redemptions, "resgate_id"),
            LinkKind::EvaluationActivation | LinkKind::EvaluationUser => {
                (Evaluations, "avaliacao_de_ativacao_id")
            }
            LinkKind::LuckyNumberUser => (LuckyNumbers, "numero_da_sorte_id"),
            LinkKind::CoinGuessUser => (Users, "user_id"),
            LinkKind::SurveyUser => (ExperienceSurveys, "pesquisa_experiencias_id"),
        };
        LinkEnd { kind, column }
    }

    /// Right foreign key
    pub fn right(self) -> LinkEnd {
        use EntityKind::*;
        let (kind, column) = match self {
            LinkKind::CheckinUser
            | LinkKind::RedemptionUser
            | LinkKind::EvaluationUser
            | LinkKind::LuckyNumberUser
            | LinkKind::SurveyUser => (Users, "user_id"),
            LinkKind::CheckinActivation | LinkKind::EvaluationActivation => {
                (Activations, "ativacao_id")
            }
            LinkKind::ActivationEvent => (Events, "evento_id"),
            LinkKind::EventClient => (Clients, "cliente_id"),
            LinkKind::RedemptionPrize => (Prizes, "brinde_id"),
            // Column name as it exists in the source database
            LinkKind::CoinGuessUser => (CoinGuesses, "chute_moedar_id"),
        };
        LinkEnd { kind, column }
    }

    /// The side of this link pointing into `kind`, if any
    pub fn side_of(self, kind: EntityKind) -> Option<Side> {
        if self.left().kind == kind {
            Some(Side::Left)
        } else if self.right().kind == kind {
            Some(Side::Right)
        } else {
            None
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.table_name())
    }
}
