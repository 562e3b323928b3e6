/// Alphabet for generated paste filenames: the 52 ASCII letters.
pub const TEXT_NAME_ALPHABET: [char; 52] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S',
    'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l',
    'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];
pub const TEXT_NAME_LENGTH: usize = 8;
pub const TEXT_NAME_SUFFIX: &str = ".txt";

/// Generate the storage filename for a text paste, e.g. `QwErTyUi.txt`.
///
/// Characters are drawn uniformly from [`TEXT_NAME_ALPHABET`] using an
/// OS-seeded CSPRNG. Uniqueness is not checked here; the uploads directory
/// refuses to overwrite an existing name and the caller retries.
pub fn generate_text_filename() -> String {
    let stem = nanoid::nanoid!(TEXT_NAME_LENGTH, &TEXT_NAME_ALPHABET);
    format!("{stem}{TEXT_NAME_SUFFIX}")
}
