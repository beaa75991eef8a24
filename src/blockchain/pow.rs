use super::hasher;

/// Number of candidates tried between checks of the abort condition
const ABORT_CHECK_INTERVAL: u64 = 1 << 12;

/// Proof of work over `sha256("{previous_proof}{proof}")`
///
/// A proof is valid when the first `difficulty` hex digits of the digest are
/// all zero. The same difficulty drives both the search and the check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofOfWork {
    difficulty: usize,
}

impl ProofOfWork {
    pub fn new(difficulty: usize) -> Self {
        ProofOfWork { difficulty }
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    /// Finds the smallest proof that is valid after `previous_proof`
    pub fn search(&self, previous_proof: u64) -> u64 {
        let mut proof = 0;

        while !self.valid(previous_proof, proof) {
            proof += 1;
        }

        proof
    }

    /// Same as [`ProofOfWork::search`] but gives up once `should_abort` returns true
    ///
    /// # Returns
    ///
    /// `None` if the search was abandoned
    pub fn search_until<F>(&self, previous_proof: u64, should_abort: F) -> Option<u64>
    where
        F: Fn() -> bool,
    {
        let mut proof = 0;

        loop {
            if proof % ABORT_CHECK_INTERVAL == 0 && should_abort() {
                return None;
            }

            if self.valid(previous_proof, proof) {
                return Some(proof);
            }

            proof += 1;
        }
    }

    /// Checks that `proof` satisfies the difficulty after `previous_proof`
    pub fn valid(&self, previous_proof: u64, proof: u64) -> bool {
        let guess = format!("{}{}", previous_proof, proof);
        let guess_hash = hasher::digest_bytes(guess.as_bytes());

        guess_hash.len() >= self.difficulty
            && guess_hash.bytes().take(self.difficulty).all(|digit| digit == b'0')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_search_returns_valid_proof() {
        let pow = ProofOfWork::new(2);

        for previous_proof in [0, 100, 35293, 12345678] {
            let proof = pow.search(previous_proof);
            assert!(pow.valid(previous_proof, proof));
        }
    }

    #[test]
    fn test_search_returns_smallest_proof() {
        let pow = ProofOfWork::new(2);
        let proof = pow.search(100);

        assert!((0..proof).all(|candidate| !pow.valid(100, candidate)));
    }

    #[test]
    fn test_known_proof_at_difficulty_four() {
        // sha256("10035293") starts with "0000"
        let pow = ProofOfWork::new(4);
        assert!(pow.valid(100, 35293));
        assert!(!pow.valid(100, 35292));
    }

    #[test]
    fn test_valid_depends_on_difficulty() {
        let pow = ProofOfWork::new(1);
        let proof = pow.search(7);
        let digest = hasher::digest_bytes(format!("7{}", proof).as_bytes());

        assert!(digest.starts_with('0'));
        assert_eq!(ProofOfWork::new(2).valid(7, proof), digest.starts_with("00"));
        assert!(ProofOfWork::new(0).valid(7, proof + 1));
    }

    #[test]
    fn test_difficulty_one_accepts_about_one_in_sixteen() {
        let pow = ProofOfWork::new(1);
        let samples = 16_000u64;
        let hits = (0..samples).filter(|&candidate| pow.valid(42, candidate)).count();

        // Expected ~1000
        assert!(hits > 800 && hits < 1200, "hits = {}", hits);
    }

    #[test]
    fn test_search_until_finds_same_proof_as_search() {
        let pow = ProofOfWork::new(2);
        assert_eq!(pow.search_until(100, || false), Some(pow.search(100)));
    }

    #[test]
    fn test_search_until_aborts() {
        let pow = ProofOfWork::new(64);
        let abort = AtomicBool::new(true);

        assert_eq!(pow.search_until(100, || abort.load(Ordering::SeqCst)), None);
    }
}
