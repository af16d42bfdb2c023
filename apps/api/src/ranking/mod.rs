// Classification & ranking engine.
// Pretrained artifacts classify the vacancy; a session-local TF-IDF space ranks candidates.

pub mod classifier;
pub mod ranker;
pub mod skills;
pub mod tfidf;

pub use classifier::{Classifier, ClusterAssignment, PretrainedModel};
pub use ranker::{rank, shortlist, RankedCandidate, ShortlistEntry};
pub use skills::{match_skills, SkillMatch};
