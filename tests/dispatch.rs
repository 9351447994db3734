use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::{test, App};
use campaign_dispatch::campaign::CampaignStatus;
use campaign_dispatch::channel::Handoff;
use campaign_dispatch::dispatch::{DispatchBody, DispatchResultBody, SessionBody};
use campaign_dispatch::recipient::{RecipientBody, RecipientStatus, SetRecipientStatusBody};
use campaign_dispatch::{configure, CampaignBody};
use serde_json::Value;

mod common;

#[actix_web::test]
async fn dispatch_walks_the_campaign_to_completion() {
    let app = test::init_service(App::new().configure(configure(common::state()))).await;

    let req = test::TestRequest::post()
        .uri("/campaigns")
        .set_json(common::create_campaign_body(&["Anna", "Bruno", "Carla"]))
        .to_request();
    let campaign: CampaignBody = test::call_and_read_body_json(&app, req).await;

    let req = test::TestRequest::get()
        .uri(&format!("/campaigns/{}/session", campaign.id))
        .to_request();
    let session: SessionBody = test::call_and_read_body_json(&app, req).await;
    assert_eq!(session.cursor, 0);
    assert_eq!(session.current.unwrap().contact.name, "Anna");
    assert_eq!(session.progress.total_count, 3);

    let req = test::TestRequest::post()
        .uri(&format!("/campaigns/{}/session/dispatch", campaign.id))
        .set_json(DispatchBody::default())
        .to_request();
    let result: DispatchResultBody = test::call_and_read_body_json(&app, req).await;
    assert_eq!(result.dispatched.contact.name, "Anna");
    assert_eq!(result.dispatched.status, RecipientStatus::Sent);
    assert_eq!(result.cursor, 1);
    assert!(!result.repeat_scheduled);

    let req = test::TestRequest::get()
        .uri(&format!("/campaigns/{}/handoffs", campaign.id))
        .to_request();
    let handoffs: Vec<Handoff> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(handoffs.len(), 1);
    assert_eq!(handoffs[0].phone, "393331234567");
    assert!(handoffs[0]
        .link
        .starts_with("https://wa.me/393331234567?text=Ciao%20Anna%2C%20"));

    let carla = session.recipients[2].id;
    let req = test::TestRequest::put()
        .uri(&format!(
            "/campaigns/{}/recipients/{}/status",
            campaign.id, carla
        ))
        .set_json(SetRecipientStatusBody {
            status: RecipientStatus::Sent,
        })
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri(&format!("/campaigns/{}/session/dispatch", campaign.id))
        .to_request();
    let result: DispatchResultBody = test::call_and_read_body_json(&app, req).await;
    assert_eq!(result.dispatched.contact.name, "Bruno");
    assert!(result.advanced);
    assert!(result.campaign_complete);

    let req = test::TestRequest::get()
        .uri(&format!("/campaigns/{}", campaign.id))
        .to_request();
    let campaign: CampaignBody = test::call_and_read_body_json(&app, req).await;
    assert_eq!(campaign.status, CampaignStatus::Completed);
    assert_eq!(campaign.sent_count, 3);
    assert_eq!(campaign.percent_complete, 100.0);
    assert!(campaign.completed_at.is_some());

    let req = test::TestRequest::post()
        .uri(&format!("/campaigns/{}/session/dispatch", campaign.id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error_code"], "E4091000");
}

#[actix_web::test]
async fn skip_past_the_last_recipient_is_a_conflict() {
    let app = test::init_service(App::new().configure(configure(common::state()))).await;

    let req = test::TestRequest::post()
        .uri("/campaigns")
        .set_json(common::create_campaign_body(&["Anna", "Bruno"]))
        .to_request();
    let campaign: CampaignBody = test::call_and_read_body_json(&app, req).await;

    let req = test::TestRequest::post()
        .uri(&format!("/campaigns/{}/session/skip", campaign.id))
        .to_request();
    let session: SessionBody = test::call_and_read_body_json(&app, req).await;
    assert_eq!(session.cursor, 1);

    let req = test::TestRequest::post()
        .uri(&format!("/campaigns/{}/session/skip", campaign.id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error_code"], "E4091001");
    assert_eq!(body["error_meta"]["cursor"], 1);

    let req = test::TestRequest::delete()
        .uri(&format!("/campaigns/{}/session", campaign.id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/campaigns/{}/session", campaign.id))
        .to_request();
    let session: SessionBody = test::call_and_read_body_json(&app, req).await;
    assert_eq!(session.cursor, 0);
}

#[actix_web::test]
async fn auto_advance_sends_everyone_until_paused() {
    let app =
        test::init_service(App::new().configure(configure(common::state_with_delay(20)))).await;

    let req = test::TestRequest::post()
        .uri("/campaigns")
        .set_json(common::create_campaign_body(&["Anna", "Bruno", "Carla"]))
        .to_request();
    let campaign: CampaignBody = test::call_and_read_body_json(&app, req).await;

    let req = test::TestRequest::post()
        .uri(&format!("/campaigns/{}/session/dispatch", campaign.id))
        .set_json(DispatchBody { auto_advance: true })
        .to_request();
    let result: DispatchResultBody = test::call_and_read_body_json(&app, req).await;
    assert!(result.repeat_scheduled);

    tokio::time::sleep(Duration::from_millis(500)).await;

    let req = test::TestRequest::get()
        .uri(&format!("/campaigns/{}/recipients", campaign.id))
        .to_request();
    let recipients: Vec<RecipientBody> = test::call_and_read_body_json(&app, req).await;
    assert!(recipients
        .iter()
        .all(|r| r.status == RecipientStatus::Sent && r.sent_at.is_some()));

    let req = test::TestRequest::get()
        .uri(&format!("/campaigns/{}/session", campaign.id))
        .to_request();
    let session: SessionBody = test::call_and_read_body_json(&app, req).await;
    assert!(!session.repeat_pending);
    assert_eq!(session.campaign.status, CampaignStatus::Completed);
}

#[actix_web::test]
async fn pause_keeps_the_next_recipient_pending() {
    let app = test::init_service(App::new().configure(configure(common::state()))).await;

    let req = test::TestRequest::post()
        .uri("/campaigns")
        .set_json(common::create_campaign_body(&["Anna", "Bruno"]))
        .to_request();
    let campaign: CampaignBody = test::call_and_read_body_json(&app, req).await;

    let req = test::TestRequest::post()
        .uri(&format!("/campaigns/{}/session/dispatch", campaign.id))
        .set_json(DispatchBody { auto_advance: true })
        .to_request();
    let result: DispatchResultBody = test::call_and_read_body_json(&app, req).await;
    assert!(result.repeat_scheduled);

    let req = test::TestRequest::post()
        .uri(&format!("/campaigns/{}/session/pause", campaign.id))
        .to_request();
    let session: SessionBody = test::call_and_read_body_json(&app, req).await;

    assert!(!session.repeat_pending);
    assert!(!session.auto_advance);
    assert_eq!(session.cursor, 1);
    assert_eq!(session.recipients[1].status, RecipientStatus::Pending);
}

#[actix_web::test]
async fn override_of_unknown_recipient_is_not_found() {
    let app = test::init_service(App::new().configure(configure(common::state()))).await;

    let req = test::TestRequest::post()
        .uri("/campaigns")
        .set_json(common::create_campaign_body(&["Anna"]))
        .to_request();
    let campaign: CampaignBody = test::call_and_read_body_json(&app, req).await;

    let req = test::TestRequest::put()
        .uri(&format!(
            "/campaigns/{}/recipients/RCP-16E77539-8873-4C8A-BCA3-2036010474AD/status",
            campaign.id
        ))
        .set_json(SetRecipientStatusBody {
            status: RecipientStatus::Sent,
        })
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error_code"], "E4041002");
}
