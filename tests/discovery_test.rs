mod common;

use anyhow::Result;
use common::{expense, income, test_service};
use spendwise::application::{AppError, MonthCount, PeriodOption};
use spendwise::domain::{Period, RecordKind};

#[tokio::test]
async fn test_available_periods_skip_large_gaps() -> Result<()> {
    let (service, _temp) = test_service().await?;

    expense(&service, 1000, "food", "2024-06-02T12:00:00").await?;
    expense(&service, 1000, "food", "2023-01-31T23:00:00").await?;
    expense(&service, 1000, "food", "2020-11-05T08:00:00").await?;

    let periods = service.list_available_periods().await?;

    assert_eq!(
        periods.months,
        vec![
            PeriodOption {
                period: Period::month(0),
                title: "This".into(),
                subtitle: Some("Month".into()),
            },
            PeriodOption {
                period: Period::month(17),
                title: "Jan".into(),
                subtitle: Some("2023".into()),
            },
            PeriodOption {
                period: Period::month(43),
                title: "Nov".into(),
                subtitle: Some("2020".into()),
            },
        ]
    );
    assert_eq!(
        periods.years,
        vec![
            PeriodOption {
                period: Period::year(0),
                title: "This".into(),
                subtitle: Some("Year".into()),
            },
            PeriodOption {
                period: Period::year(1),
                title: "2023".into(),
                subtitle: None,
            },
            PeriodOption {
                period: Period::year(4),
                title: "2020".into(),
                subtitle: None,
            },
        ]
    );

    Ok(())
}

#[tokio::test]
async fn test_available_periods_on_empty_store() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let periods = service.list_available_periods().await?;

    assert!(periods.months.is_empty());
    assert!(periods.years.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_available_periods_combine_both_kinds() -> Result<()> {
    let (service, _temp) = test_service().await?;

    expense(&service, 1000, "food", "2024-05-10T12:00:00").await?;
    income(&service, 90000, "salary", "2024-02-01T09:00:00").await?;

    let periods = service.list_available_periods().await?;

    let month_offsets: Vec<u32> = periods.months.iter().map(|o| o.period.offset).collect();
    assert_eq!(month_offsets, vec![1, 4]);
    assert_eq!(periods.months[0].title, "May");
    assert_eq!(periods.months[1].title, "Feb");

    let year_offsets: Vec<u32> = periods.years.iter().map(|o| o.period.offset).collect();
    assert_eq!(year_offsets, vec![0]);

    Ok(())
}

#[tokio::test]
async fn test_months_with_counts() -> Result<()> {
    let (service, _temp) = test_service().await?;

    expense(&service, 1000, "food", "2024-06-02T12:00:00").await?;
    expense(&service, 1000, "food", "2024-06-09T12:00:00").await?;
    expense(&service, 1000, "food", "2024-03-01T00:00:00").await?;
    expense(&service, 1000, "food", "2022-12-31T23:59:59.999").await?;
    // Incomes don't count toward the expense listing
    income(&service, 5000, "salary", "2024-05-01T09:00:00").await?;

    let months = service.list_months_with_counts(RecordKind::Expense).await?;

    assert_eq!(
        months,
        vec![
            MonthCount {
                offset_month: 0,
                month_label: "June 2024".into(),
                count: 2,
            },
            MonthCount {
                offset_month: 3,
                month_label: "March 2024".into(),
                count: 1,
            },
            MonthCount {
                offset_month: 18,
                month_label: "December 2022".into(),
                count: 1,
            },
        ]
    );

    Ok(())
}

#[tokio::test]
async fn test_months_ignore_trashed_records() -> Result<()> {
    let (service, _temp) = test_service().await?;

    expense(&service, 1000, "food", "2024-06-02T12:00:00").await?;
    let old = expense(&service, 1000, "food", "2021-04-02T12:00:00").await?;
    service.delete_record(RecordKind::Expense, old.id).await?;

    let months = service.list_months_with_counts(RecordKind::Expense).await?;
    assert_eq!(months.len(), 1);
    assert_eq!(months[0].offset_month, 0);

    let periods = service.list_available_periods().await?;
    assert_eq!(periods.years.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_discovery_starts_before_a_quiet_current_month() -> Result<()> {
    let (service, _temp) = test_service().await?;

    // Nothing this month; the newest record is years back
    income(&service, 1000, "gift", "2019-07-04T12:00:00").await?;

    let months = service.list_months_with_counts(RecordKind::Income).await?;
    assert_eq!(months.len(), 1);
    assert_eq!(months[0].offset_month, 59);
    assert_eq!(months[0].month_label, "July 2019");

    Ok(())
}

#[tokio::test]
async fn test_discovery_jumps_over_empty_buckets() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let service = service.with_discovery_limit(3);

    expense(&service, 1000, "food", "2024-06-02T12:00:00").await?;
    expense(&service, 1000, "food", "2023-01-31T23:00:00").await?;
    expense(&service, 1000, "food", "2020-11-05T08:00:00").await?;

    // One step per filled bucket, however wide the gaps between them
    let periods = service.list_available_periods().await?;
    let month_offsets: Vec<u32> = periods.months.iter().map(|o| o.period.offset).collect();
    assert_eq!(month_offsets, vec![0, 17, 43]);
    let year_offsets: Vec<u32> = periods.years.iter().map(|o| o.period.offset).collect();
    assert_eq!(year_offsets, vec![0, 1, 4]);

    let months = service.list_months_with_counts(RecordKind::Expense).await?;
    assert_eq!(months.len(), 3);

    Ok(())
}

#[tokio::test]
async fn test_discovery_step_limit() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let service = service.with_discovery_limit(1);

    expense(&service, 1000, "food", "2024-06-02T12:00:00").await?;
    expense(&service, 1000, "food", "2023-01-31T23:00:00").await?;

    let result = service.list_available_periods().await;
    assert!(matches!(
        result,
        Err(AppError::DiscoveryLimitExceeded { steps: 1 })
    ));

    let result = service.list_months_with_counts(RecordKind::Expense).await;
    assert!(matches!(
        result,
        Err(AppError::DiscoveryLimitExceeded { steps: 1 })
    ));

    Ok(())
}
