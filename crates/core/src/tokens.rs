/// Approximates the token count of `text` by its whitespace-separated
/// words.
#[inline]
pub fn approximate_tokens(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approximate_tokens() {
        assert_eq!(approximate_tokens(""), 0);
        assert_eq!(approximate_tokens("   "), 0);
        assert_eq!(approximate_tokens("Hello "), 1);
        assert_eq!(approximate_tokens(" Hello\n world\t! "), 3);
    }
}
