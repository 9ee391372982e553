use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegalGuidance {
    pub sections: Vec<&'static str>,
    pub steps: Vec<&'static str>,
    pub timeframe: &'static str,
}

pub fn legal_guidance(complaint_type: &str) -> LegalGuidance {
    match complaint_type {
        "bribery" => LegalGuidance {
            sections: vec!["IPC Section 171B", "Prevention of Corruption Act"],
            steps: vec![
                "Collect evidence of demand",
                "File complaint with ACB",
                "Apply for witness protection",
            ],
            timeframe: "Investigation typically completes within 90 days",
        },
        "harassment" => LegalGuidance {
            sections: vec!["IPC Section 354", "Sexual Harassment Act"],
            steps: vec![
                "Document all incidents",
                "File FIR with local police",
                "Contact Internal Complaints Committee",
            ],
            timeframe: "Action must be taken within 3 months",
        },
        "delay" => LegalGuidance {
            sections: vec!["Citizen Charter", "Right to Service Act"],
            steps: vec![
                "Submit written complaint to department head",
                "File RTI application for status update",
                "Approach Centralized Public Grievance Redress System",
            ],
            timeframe: "Service must be provided within stipulated time",
        },
        _ => LegalGuidance {
            sections: Vec::new(),
            steps: Vec::new(),
            timeframe: "No specific guidance available for this complaint type.",
        },
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProtectionAssessment {
    pub measures: Vec<&'static str>,
    pub risk_level: &'static str,
}

/// Whistleblower protections for the requested anonymity and complaint type.
pub fn protection_assessment(anonymity_level: Option<&str>, complaint_type: &str) -> ProtectionAssessment {
    let mut measures = if anonymity_level == Some("full") {
        vec![
            "Complete identity protection throughout the process",
            "Use of anonymous reporting channels",
            "Legal representation by government-appointed lawyer",
        ]
    } else {
        vec![
            "Partial identity protection",
            "Identity revealed only to investigating officer",
        ]
    };

    match complaint_type {
        "bribery" => measures.extend([
            "Protection from retaliation by accused official",
            "Witness protection program if threat level is high",
        ]),
        "harassment" => measures.extend([
            "Immediate police protection",
            "Relocation assistance if necessary",
        ]),
        _ => {}
    }

    ProtectionAssessment {
        measures,
        risk_level: if matches!(complaint_type, "bribery" | "harassment") {
            "High"
        } else {
            "Medium"
        },
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Service {
    pub id: u32,
    pub name: &'static str,
}

/// Government services citizens can leave feedback on.
pub fn services() -> Vec<Service> {
    [
        "Passport Office",
        "RTO",
        "Municipal Corporation",
        "Electricity Department",
        "Water Supply Department",
    ]
    .into_iter()
    .zip(1..)
    .map(|(name, id)| Service { id, name })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_types_have_guidance() {
        let guidance = legal_guidance("bribery");
        assert_eq!(guidance.sections.len(), 2);
        assert_eq!(guidance.steps.len(), 3);
    }

    #[test]
    fn unknown_types_get_empty_guidance() {
        let guidance = legal_guidance("littering");
        assert!(guidance.sections.is_empty());
        assert!(guidance.steps.is_empty());
        assert!(guidance.timeframe.starts_with("No specific guidance"));
    }

    #[test]
    fn full_anonymity_for_bribery_is_high_risk() {
        let assessment = protection_assessment(Some("full"), "bribery");
        assert_eq!(assessment.measures.len(), 5);
        assert_eq!(assessment.risk_level, "High");
        assert!(assessment
            .measures
            .contains(&"Use of anonymous reporting channels"));
    }

    #[test]
    fn partial_anonymity_for_delay_is_medium_risk() {
        let assessment = protection_assessment(None, "delay");
        assert_eq!(assessment.measures.len(), 2);
        assert_eq!(assessment.risk_level, "Medium");
    }

    #[test]
    fn services_are_numbered_from_one() {
        let catalogue = services();
        assert_eq!(catalogue.len(), 5);
        assert_eq!(catalogue[0].id, 1);
        assert_eq!(catalogue[4].name, "Water Supply Department");
    }
}
