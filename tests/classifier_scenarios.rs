//! End-to-end classifier scenarios over realistic German procedure text.

use chrono::NaiveDate;

use bessharvest::classify::{
    classify, is_valid_procedure, prefilter_score, should_extract, normalize, SkipReason,
};
use bessharvest::models::{
    CrawlMode, DiscoverySource, LegalBasis, ProcedureType, ProjectComponents,
};

fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

#[test]
fn aufstellungsbeschluss_with_bess_title() {
    let title = "Aufstellungsbeschluss Bebauungsplan Nr. 12/2024 Batteriespeicheranlage Metzdorf";
    let text = "Die Gemeindevertretung hat in ihrer Sitzung den Beschluss zur Aufstellung \
                des Bebauungsplans Nr. 12/2024 \"Batteriespeicheranlage Metzdorf\" gefasst.";

    let result = classify(text, title, date(2024, 3, 1), DiscoverySource::Ris);
    assert!(result.is_relevant);
    assert_eq!(result.procedure_type, ProcedureType::BplanAufstellung);
    assert_eq!(result.legal_basis, LegalBasis::Unknown);
    assert_eq!(result.project_components, ProjectComponents::BessOnly);
    assert!((result.confidence - 0.80).abs() < 0.05);

    // The prefilter admits this title at every threshold.
    let score = prefilter_score(title, "https://ris.beispielstadt.de/to0100.asp?id=991");
    assert!(should_extract(score, DiscoverySource::Ris, CrawlMode::Fast));
    assert!(should_extract(score, DiscoverySource::Ris, CrawlMode::Deep));
    assert!(should_extract(score, DiscoverySource::MunicipalWebsite, CrawlMode::Fast));
}

#[test]
fn gazette_issue_with_unrelated_items_is_container() {
    let title = "Amtsblatt Nr. 07/2024 der Stadt Beispielstadt";
    let text = "Inhaltsverzeichnis: Haushaltssatzung 2024. Hundesteuersatzung. \
                Ehrung der Altersjubilare. Schließzeiten der Kita.";

    let result = classify(text, title, date(2024, 7, 1), DiscoverySource::Amtsblatt);
    let verdict = is_valid_procedure(
        &normalize(title).text,
        "https://www.beispielstadt.de/amtsblatt/07-2024.pdf",
        DiscoverySource::Amtsblatt,
        &result,
        &normalize(text).text,
    );
    assert_eq!(verdict, Err(SkipReason::Container));
}

#[test]
fn einvernehmen_36_for_bess_on_parcel() {
    let title = "Einvernehmen gemäß §36 BauGB — Errichtung einer Batteriespeicheranlage \
                 auf Flurstück 123/4";
    let text = "Die Gemeinde erteilt das Einvernehmen gemäß § 36 BauGB zum Antrag auf \
                Errichtung einer Batteriespeicheranlage auf dem Flurstück 123/4 der \
                Gemarkung Metzdorf.";

    let result = classify(text, title, date(2024, 5, 13), DiscoverySource::Ris);
    assert!(result.is_relevant);
    assert_eq!(result.procedure_type, ProcedureType::Permit36Einvernehmen);
    assert_eq!(result.legal_basis, LegalBasis::Para36);
    assert!(is_valid_procedure(
        &normalize(title).text,
        "https://ris.beispielstadt.de/vo0200.asp?id=17",
        DiscoverySource::Ris,
        &result,
        &normalize(text).text,
    )
    .is_ok());
}

#[test]
fn ambiguous_speicher_with_grid_context() {
    let title = "Bauleitplanung — Sondergebiet Photovoltaik mit Speicheranlage, \
                 Umspannwerk Anschluss 110 kV";
    let result = classify(title, title, None, DiscoverySource::MunicipalWebsite);
    assert!(result.is_relevant);
    assert!(result.ambiguity_flag);
    assert_eq!(result.project_components, ProjectComponents::PvBess);
    assert!(!result.review_recommended);
}

#[test]
fn waermespeicher_is_rejected_everywhere() {
    let title = "Satzung über die öffentliche Bekanntmachung — Wärmespeicher Stadtwerke";
    let result = classify(title, title, date(2024, 1, 15), DiscoverySource::Amtsblatt);
    assert!(!result.is_relevant);
    assert!(result.confidence < 0.01);

    let score = prefilter_score(title, "https://www.beispielstadt.de/satzungen");
    assert!(!should_extract(score, DiscoverySource::Ris, CrawlMode::Deep));
    assert!(!should_extract(score, DiscoverySource::Amtsblatt, CrawlMode::Deep));
}

#[test]
fn classify_is_pure() {
    let title = "Öffentliche Auslegung Bebauungsplan \"Energiespeicher Süd\"";
    let text = "Der Entwurf des Bebauungsplans \"Energiespeicher Süd\" liegt öffentlich aus. \
                Geplant sind ein Batteriespeicher mit 40 MW / 80 MWh und ein Netzanschluss \
                an das Umspannwerk.";
    let a = classify(text, title, date(2024, 2, 2), DiscoverySource::Amtsblatt);
    let b = classify(text, title, date(2024, 2, 2), DiscoverySource::Amtsblatt);
    assert_eq!(a, b);
}
