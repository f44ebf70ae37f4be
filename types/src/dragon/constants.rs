/// Maximum number of buff slots carried for a dragon.
pub const MAX_BUFFS: usize = 8;

/// Maximum length of a battle seed rendered as decimal text (a 256-bit word has 78 digits).
pub const MAX_SEED_LENGTH: usize = 78;

/// Maximum number of applicant dragons tracked for a gladiator battle.
pub const MAX_APPLICANTS: usize = 1_000;
