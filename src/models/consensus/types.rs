use serde::Serialize;

text_enum! {
    /// Lifecycle of a quarterly report.
    pub enum ConsensusStatus {
        Pending => "PENDING",
        InConsensus => "IN_CONSENSUS",
        Consensed => "CONSENSED",
        Rejected => "REJECTED",
    }
}

text_enum! {
    /// Lifecycle of a proposal.
    pub enum ProposalStatus {
        InReview => "IN_REVIEW",
        Approved => "APPROVED",
        Rejected => "REJECTED",
        Expired => "EXPIRED",
    }
}

text_enum! {
    pub enum VoteType {
        AFavor => "A_FAVOR",
        EnContra => "EN_CONTRA",
        Objetar => "OBJETAR",
        Abstenerse => "ABSTENERSE",
    }
}

text_enum! {
    pub enum ObjectionStatus {
        Pendiente => "PENDIENTE",
        Valida => "VALIDA",
        Invalida => "INVALIDA",
    }
}

/// Vote counts per type plus their sum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VoteTally {
    #[serde(rename = "A_FAVOR")]
    pub a_favor: i64,
    #[serde(rename = "EN_CONTRA")]
    pub en_contra: i64,
    #[serde(rename = "OBJETAR")]
    pub objetar: i64,
    #[serde(rename = "ABSTENERSE")]
    pub abstenerse: i64,
    pub total: i64,
}

impl VoteTally {
    pub fn from_votes<I>(votes: I) -> Self
    where
        I: IntoIterator<Item = VoteType>,
    {
        let mut tally = VoteTally::default();
        for vote in votes {
            tally.add(vote);
        }
        tally
    }

    pub fn add(&mut self, vote: VoteType) {
        match vote {
            VoteType::AFavor => self.a_favor += 1,
            VoteType::EnContra => self.en_contra += 1,
            VoteType::Objetar => self.objetar += 1,
            VoteType::Abstenerse => self.abstenerse += 1,
        }
        self.total += 1;
    }

    pub fn count(&self, vote: VoteType) -> i64 {
        match vote {
            VoteType::AFavor => self.a_favor,
            VoteType::EnContra => self.en_contra,
            VoteType::Objetar => self.objetar,
            VoteType::Abstenerse => self.abstenerse,
        }
    }
}
