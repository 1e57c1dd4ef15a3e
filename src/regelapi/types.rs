//! Wire types for the regel-api behov and subsumsjon endpoints.
//!
//! The field names follow the regel-api JSON contract (camelCase). Optional
//! facts and absent results are skipped on serialisation so a
//! [`Subsumsjon`] can be handed back to the caller as-is.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which rule variant the regel-api should evaluate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegelKontekst {
    pub id: String,
    #[serde(rename = "type")]
    pub kontekst_type: String,
}

/// Income period used in place of the one regel-api would pick itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InntektsPeriode {
    /// First month, `YYYY-MM`.
    pub forste_maned: String,
    /// Last month, `YYYY-MM`.
    pub siste_maned: String,
}

/// Body of `POST /behov`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehovRequest {
    pub aktor_id: String,
    /// Date the rules are evaluated at.
    pub beregningsdato: NaiveDate,
    pub regelkontekst: RegelKontekst,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inntekts_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inntekt_avvik: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inntekt_manuelt_redigert: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub har_avtjent_verneplikt: Option<bool>,
    // Fishing income counts towards the minimum.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oppfyller_krav_til_fangst_og_fisk: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub antall_barn: Option<u32>,
    /// Overrides the basis computed from income.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manuelt_grunnlag: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brukt_inntekts_periode: Option<InntektsPeriode>,
}

impl BehovRequest {
    /// A request with no case-specific facts. The kontekst id is the actor id.
    pub fn new(aktor_id: &str, kontekst: &str, beregningsdato: NaiveDate) -> Self {
        Self {
            aktor_id: aktor_id.to_string(),
            beregningsdato,
            regelkontekst: RegelKontekst {
                id: aktor_id.to_string(),
                kontekst_type: kontekst.to_string(),
            },
            inntekts_id: None,
            inntekt_avvik: None,
            inntekt_manuelt_redigert: None,
            har_avtjent_verneplikt: None,
            oppfyller_krav_til_fangst_og_fisk: None,
            antall_barn: None,
            manuelt_grunnlag: None,
            brukt_inntekts_periode: None,
        }
    }
}

/// Lifecycle state reported by the behov status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BehovStatus {
    Pending,
    Done,
    Failed,
    /// Anything else the regel-api might send.
    #[serde(other)]
    Unknown,
}

/// Body of `GET {handle}` while the status endpoint answers with 2xx.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusEnvelope {
    #[serde(default)]
    pub status: Option<BehovStatus>,
    /// Result link, when the regel-api reports DONE in the body.
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinsteinntektResultat {
    pub subsumsjons_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sporings_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regel_identifikator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oppfyller_minsteinntekt: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodeResultat {
    pub subsumsjons_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sporings_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regel_identifikator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub periode_antall_uker: Option<u32>,
}

/// Basis amounts are decimal strings in the regel-api contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrunnlagResultat {
    pub subsumsjons_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sporings_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regel_identifikator: Option<String>,
    /// Basis after the 6G cap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avkortet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uavkortet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beregningsregel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub har_avkortet: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SatsResultat {
    pub subsumsjons_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sporings_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regel_identifikator: Option<String>,
    /// Daily rate in whole kroner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dagsats: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ukesats: Option<i64>,
    #[serde(
        default,
        rename = "benyttet90ProsentRegel",
        skip_serializing_if = "Option::is_none"
    )]
    pub benyttet_90_prosent_regel: Option<bool>,
}

/// The decision document for a completed behov.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subsumsjon {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behov_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minsteinntekt_resultat: Option<MinsteinntektResultat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub periode_resultat: Option<PeriodeResultat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grunnlag_resultat: Option<GrunnlagResultat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sats_resultat: Option<SatsResultat>,
}

impl Subsumsjon {
    /// Identifiers of the results present, in regel order.
    pub fn subsumsjons_ider(&self) -> Vec<&str> {
        [
            self.minsteinntekt_resultat.as_ref().map(|r| r.subsumsjons_id.as_str()),
            self.periode_resultat.as_ref().map(|r| r.subsumsjons_id.as_str()),
            self.grunnlag_resultat.as_ref().map(|r| r.subsumsjons_id.as_str()),
            self.sats_resultat.as_ref().map(|r| r.subsumsjons_id.as_str()),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn behov_request_omits_absent_facts() {
        let date = NaiveDate::from_ymd_opt(2020, 4, 1).unwrap();
        let req = BehovRequest::new("001", "corona", date);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "aktorId": "001",
                "beregningsdato": "2020-04-01",
                "regelkontekst": { "id": "001", "type": "corona" }
            })
        );
    }

    #[test]
    fn behov_request_carries_facts_in_camel_case() {
        let date = NaiveDate::from_ymd_opt(2020, 4, 1).unwrap();
        let mut req = BehovRequest::new("001", "veiledning", date);
        req.antall_barn = Some(2);
        req.har_avtjent_verneplikt = Some(true);
        req.brukt_inntekts_periode = Some(InntektsPeriode {
            forste_maned: "2019-01".into(),
            siste_maned: "2019-12".into(),
        });
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["antallBarn"], 2);
        assert_eq!(json["harAvtjentVerneplikt"], true);
        assert_eq!(json["bruktInntektsPeriode"]["forsteManed"], "2019-01");
        assert!(json.get("manueltGrunnlag").is_none());
    }

    #[test]
    fn status_envelope_tolerates_missing_and_unknown_status() {
        let missing: StatusEnvelope = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.status, None);

        let unknown: StatusEnvelope = serde_json::from_str(r#"{"status":"WRITING"}"#).unwrap();
        assert_eq!(unknown.status, Some(BehovStatus::Unknown));

        let done: StatusEnvelope =
            serde_json::from_str(r#"{"status":"DONE","location":"/subsumsjon/1"}"#).unwrap();
        assert_eq!(done.status, Some(BehovStatus::Done));
        assert_eq!(done.location.as_deref(), Some("/subsumsjon/1"));
    }

    #[test]
    fn subsumsjon_with_single_result() {
        let json = r#"{
            "behovId": "01DBFXH3BE9R1PDBQ6KJ4TTZ6H",
            "faktum": { "aktorId": "001" },
            "minsteinntektResultat": {
                "subsumsjonsId": "01DBFXH3N1BSSVXB6X0GVFV7X3",
                "oppfyllerMinsteinntekt": true,
                "minsteinntektInntektsPerioder": []
            }
        }"#;
        let subsumsjon: Subsumsjon = serde_json::from_str(json).unwrap();
        let minsteinntekt = subsumsjon.minsteinntekt_resultat.as_ref().unwrap();
        assert_eq!(minsteinntekt.subsumsjons_id, "01DBFXH3N1BSSVXB6X0GVFV7X3");
        assert_eq!(minsteinntekt.oppfyller_minsteinntekt, Some(true));
        assert!(subsumsjon.periode_resultat.is_none());
        assert!(subsumsjon.grunnlag_resultat.is_none());
        assert!(subsumsjon.sats_resultat.is_none());
    }

    #[test]
    fn subsumsjon_serialises_without_absent_results() {
        let subsumsjon = Subsumsjon {
            sats_resultat: Some(SatsResultat {
                subsumsjons_id: "s1".into(),
                sporings_id: None,
                regel_identifikator: None,
                dagsats: Some(1200),
                ukesats: Some(6000),
                benyttet_90_prosent_regel: Some(false),
            }),
            ..Default::default()
        };
        let json = serde_json::to_value(&subsumsjon).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "satsResultat": {
                    "subsumsjonsId": "s1",
                    "dagsats": 1200,
                    "ukesats": 6000,
                    "benyttet90ProsentRegel": false
                }
            })
        );
        assert_eq!(subsumsjon.subsumsjons_ider(), vec!["s1"]);
    }
}
