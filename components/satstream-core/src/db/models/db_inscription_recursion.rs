use regex::Regex;
use satstream_types::OrdinalInscriptionRevealData;

lazy_static! {
    pub static ref RECURSIVE_INSCRIPTION_REGEX: Regex =
        Regex::new(r"/content/([a-fA-F0-9]{64}i\d+)").expect("failed to compile recursion regex");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbInscriptionRecursion {
    pub inscription_id: String,
    pub ref_inscription_id: String,
}

impl DbInscriptionRecursion {
    /// Recursion discovery is purely syntactic over the content bytes. The referenced inscription
    /// does not need to exist.
    pub fn from_reveal(reveal: &OrdinalInscriptionRevealData) -> Result<Vec<Self>, String> {
        let bytes = hex::decode(&reveal.content_bytes)
            .map_err(|e| format!("unable to decode inscription content for recursion: {e}"))?;
        let Ok(utf8_str) = String::from_utf8(bytes) else {
            // Not a string, we should fail silently.
            return Ok(vec![]);
        };
        let mut results = vec![];
        for capture in RECURSIVE_INSCRIPTION_REGEX.captures_iter(&utf8_str) {
            results.push(DbInscriptionRecursion {
                inscription_id: reveal.inscription_id.clone(),
                ref_inscription_id: capture.get(1).unwrap().as_str().to_string(),
            });
        }
        Ok(results)
    }
}

#[cfg(test)]
mod test {
    use satstream_types::{OrdinalInscriptionNumber, OrdinalInscriptionRevealData};

    use super::DbInscriptionRecursion;

    fn reveal_with_content(content: &str) -> OrdinalInscriptionRevealData {
        OrdinalInscriptionRevealData {
            content_bytes: hex::encode(content),
            content_type: "text/html".to_string(),
            content_length: content.len(),
            inscription_number: OrdinalInscriptionNumber {
                jubilee: 79027291,
                classic: 79027291,
            },
            inscription_fee: 100,
            inscription_output_value: 546,
            inscription_id: "e47a70a218dfa746ba410b1c057403bb481523d830562fd8dec61ec4d2915e5fi0"
                .to_string(),
            inscription_input_index: 0,
            inscription_pointer: Some(0),
            inscriber_address: Some(
                "bc1petvmwa7qe55jfnmqvqel6k8096s62d59c9qm2j4ypgdjwqthxt4q99stkz".to_string(),
            ),
            delegate: None,
            metaprotocol: None,
            metadata: None,
            parents: vec![],
            ordinal_number: 959876891264081,
            ordinal_block_height: 191975,
            ordinal_offset: 0,
            tx_index: 0,
            satpoint_post_inscription:
                "e47a70a218dfa746ba410b1c057403bb481523d830562fd8dec61ec4d2915e5f:0:0".to_string(),
            curse_type: None,
            charms: 0,
        }
    }

    #[test]
    fn extracts_content_references() {
        let reveal = reveal_with_content(
            "<img src=\"/content/a1f0878d02a3f872b0542faf605c996306826f8ac96434c6213bd4988b769bb6i0\"/>\
             <script src=\"/content/389d4636224429262873e3d167eda4b5aba4b1e9dfe585519217b2596ba53c1ci0\"></script>",
        );
        let recursions = DbInscriptionRecursion::from_reveal(&reveal).unwrap();
        assert_eq!(2, recursions.len());
        assert_eq!(
            recursions[0].ref_inscription_id,
            "a1f0878d02a3f872b0542faf605c996306826f8ac96434c6213bd4988b769bb6i0"
        );
        assert_eq!(
            recursions[1].ref_inscription_id,
            "389d4636224429262873e3d167eda4b5aba4b1e9dfe585519217b2596ba53c1ci0"
        );
    }

    #[test]
    fn ignores_content_without_references() {
        let reveal = reveal_with_content("hello inscriptions");
        let recursions = DbInscriptionRecursion::from_reveal(&reveal).unwrap();
        assert!(recursions.is_empty());
    }

    #[test]
    fn ignores_binary_content() {
        let mut reveal = reveal_with_content("");
        reveal.content_bytes = "fffefd".to_string();
        let recursions = DbInscriptionRecursion::from_reveal(&reveal).unwrap();
        assert!(recursions.is_empty());
    }
}
